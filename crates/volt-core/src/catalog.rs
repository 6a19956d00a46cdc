//! Read-only reference catalog of mining equipment.

use crate::MiningEquipmentSpec;
use rust_decimal::Decimal;

// (model, TH/s, W, USD)
const CATALOG: &[(&str, f64, f64, i64)] = &[
    ("Antminer S21", 200.0, 3550.0, 5_800),
    ("Antminer S21 Pro", 234.0, 3510.0, 7_200),
    ("Antminer S19 XP", 140.0, 3010.0, 2_800),
    ("Antminer S19j Pro", 104.0, 3068.0, 1_200),
    ("Whatsminer M60S", 186.0, 3441.0, 4_500),
    ("Whatsminer M50S", 126.0, 3276.0, 2_100),
    ("Avalon A1466", 150.0, 3230.0, 3_100),
];

/// All catalog entries, in listing order.
pub fn equipment_catalog() -> Vec<MiningEquipmentSpec> {
    CATALOG
        .iter()
        .map(|&(model, ths, watts, usd)| MiningEquipmentSpec {
            model: model.to_string(),
            hashrate_ths: ths,
            power_watts: watts,
            price_usd: Decimal::from(usd),
        })
        .collect()
}

/// Look up a catalog entry by model name, ignoring case and surrounding whitespace.
pub fn find_equipment(model: &str) -> Option<MiningEquipmentSpec> {
    let wanted = model.trim();
    equipment_catalog()
        .into_iter()
        .find(|spec| spec.model.eq_ignore_ascii_case(wanted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate_equipment;

    #[test]
    fn catalog_entries_are_valid() {
        let catalog = equipment_catalog();
        assert!(!catalog.is_empty());
        for spec in &catalog {
            validate_equipment(spec).unwrap();
        }
    }

    #[test]
    fn lookup_ignores_case() {
        let s21 = find_equipment("  antminer s21 ").unwrap();
        assert_eq!(s21.hashrate_ths, 200.0);
        assert_eq!(s21.power_watts, 3550.0);
        assert!(find_equipment("Antminer S9000").is_none());
    }
}
