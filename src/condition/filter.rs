//! Pruning of blank operands, so filter forms can pass unset fields straight through.

use crate::operand::Operand;

/// Removes blank operands from a condition.
///
/// Hash conditions drop blank values. AND/OR/NOT drop blank branches and vanish when nothing
/// is left. BETWEEN vanishes when either bound is blank, every other operator when its value
/// is blank. A vanished condition is an empty list.
pub fn filter_condition(condition: Operand) -> Operand {
    match condition {
        Operand::Map(hash) => Operand::Map(
            hash.into_iter()
                .filter(|(_, value)| !value.is_empty())
                .collect(),
        ),
        Operand::List(items) => filter_operator(items),
        other => other,
    }
}

fn filter_operator(mut items: Vec<Operand>) -> Operand {
    let Some(operator) = items.first().and_then(Operand::as_str).map(str::to_uppercase) else {
        return Operand::List(items);
    };

    match operator.as_str() {
        "AND" | "OR" | "NOT" => {
            let operator = items.remove(0);
            let mut operands: Vec<Operand> = items
                .into_iter()
                .map(filter_condition)
                .filter(|operand| !operand.is_empty())
                .collect();
            if operands.is_empty() {
                return Operand::List(Vec::new());
            }
            operands.insert(0, operator);
            Operand::List(operands)
        }
        "BETWEEN" | "NOT BETWEEN" => {
            let blank = |index: usize| items.get(index).is_none_or(Operand::is_empty);
            if blank(2) || blank(3) {
                Operand::List(Vec::new())
            } else {
                Operand::List(items)
            }
        }
        _ => {
            if items.get(2).is_none_or(Operand::is_empty) {
                Operand::List(Vec::new())
            } else {
                Operand::List(items)
            }
        }
    }
}
