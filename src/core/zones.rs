//! Gate-zone names for qubit-index keys, per machine.

use crate::core::Selector;

type Labels = &'static [(&'static str, &'static str)];

const H1_ZONES: Labels = &[
    ("0, 1", "G1"),
    ("2, 3", "G2"),
    ("4, 5", "G3"),
    ("6, 7", "G4"),
    ("8, 9", "G5"),
    ("0", "G1-left"),
    ("1", "G1-right"),
    ("2", "G2-left"),
    ("3", "G2-right"),
    ("4", "G3-left"),
    ("5", "G3-right"),
    ("6", "G4-left"),
    ("7", "G4-right"),
    ("8", "G5-left"),
    ("9", "G5-right"),
];

/// H1-2 在 2022 年 (含) 之前只有三個閘區
const H1_2_EARLY_ZONES: Labels = &[
    ("0, 1", "G2"),
    ("2, 3", "G3"),
    ("4, 5", "G4"),
    ("0", "G2-left"),
    ("1", "G2-right"),
    ("2", "G3-left"),
    ("3", "G3-right"),
    ("4", "G4-left"),
    ("5", "G4-right"),
];

const H2_ZONES: Labels = &[
    ("0, 1", "DG01"),
    ("2, 3", "DG02"),
    ("4, 5", "DG03"),
    ("6, 7", "DG04"),
    ("0", "DG01-left"),
    ("1", "DG01-right"),
    ("2", "DG02-left"),
    ("3", "DG02-right"),
    ("4", "DG03-left"),
    ("5", "DG03-right"),
    ("6", "DG04-left"),
    ("7", "DG04-right"),
];

fn labels_for(machine: &str, year: Option<i32>) -> Option<Labels> {
    match machine {
        "H1-1" | "REIMEI" => Some(H1_ZONES),
        "H1-2" if year.is_some_and(|y| y > 2022) => Some(H1_ZONES),
        "H1-2" => Some(H1_2_EARLY_ZONES),
        "H2-1" => Some(H2_ZONES),
        _ => None,
    }
}

pub fn zone_label(selector: &Selector, qubits: &str) -> Option<&'static str> {
    labels_for(&selector.machine, selector.year())?
        .iter()
        .find(|(key, _)| *key == qubits)
        .map(|(_, label)| *label)
}

/// 全部都能對應時才換成閘區名稱，否則保留原本的 key
pub fn relabel(selector: &Selector, keys: &[&str]) -> Vec<String> {
    let labels: Option<Vec<String>> = keys
        .iter()
        .map(|key| zone_label(selector, key).map(str::to_string))
        .collect();

    labels.unwrap_or_else(|| keys.iter().map(|k| k.to_string()).collect())
}
