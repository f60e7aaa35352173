use crate::reflect::{PropertyInfo, Value};
use crate::registry::TypeDescriptor;
use crate::session::{PopulateReport, UnitFailure};

/// `[queries::EventFilterQuery] - Class`
pub fn format_type_heading(descriptor: &TypeDescriptor) -> String {
    format!("[{}] - {}", descriptor.full_name(), descriptor.kind())
}

/// `\tCompanyId : Option<i32>`, with inherited properties marked.
pub fn format_property_line(prop: &PropertyInfo) -> String {
    if prop.declared {
        format!("\t{} : {}", prop.name, prop.ty)
    } else {
        format!("\t{} : {} (inherited)", prop.name, prop.ty)
    }
}

/// `\tMaxRows=25`
pub fn format_value_line(name: &str, value: &Value) -> String {
    format!("\t{}={}", name, value)
}

/// Rows for a `Get *` table.
pub fn format_value_rows(values: &[(String, Value)]) -> Vec<(String, String)> {
    values
        .iter()
        .map(|(name, value)| (name.clone(), value.to_string()))
        .collect()
}

pub fn format_population_summary(report: &PopulateReport, registered: usize) -> String {
    let mut line = format!(
        "{} type(s) registered from {} of {} source unit(s)",
        registered, report.loaded, report.units
    );
    if report.cancelled {
        line.push_str(" (cancelled)");
    }
    line
}

pub fn format_unit_failure(failure: &UnitFailure) -> String {
    format!("\t{} failed to {}: {}", failure.unit, failure.stage, failure.message)
}
