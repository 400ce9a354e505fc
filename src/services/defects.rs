//! Defect class vocabulary.
//!
//! The external detection service reports defect classes by their model
//! vocabulary names; operators see Russian display labels. Classes missing
//! from the table pass through untranslated.

/// External class name → display label.
pub const DEFECT_LABELS: &[(&str, &str)] = &[
    ("cracks", "Трещина(ы)"),
    ("corrosion", "Коррозия"),
    ("rust", "Ржавчина"),
    ("spalling", "Отслоение бетона"),
    ("exposed_rebar", "Оголение арматуры"),
    ("efflorescence", "Высолы"),
    ("vegetation", "Растительность"),
    ("joint_damage", "Повреждение шва"),
];

/// Translate an external defect class to its display label, falling back
/// to the raw class name when untranslated.
pub fn display_label(class_name: &str) -> String {
    DEFECT_LABELS
        .iter()
        .find(|(class, _)| *class == class_name)
        .map(|(_, label)| (*label).to_string())
        .unwrap_or_else(|| class_name.to_string())
}
