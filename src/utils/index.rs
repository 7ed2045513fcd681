/// Render a milli-unit amount as a decimal string, e.g. `-1368000` as `-1368.000`.
pub fn format_milli_units(milli_units: i64) -> String {
    let sign = if milli_units < 0 { "-" } else { "" };
    let abs = milli_units.unsigned_abs();
    format!("{}{}.{:03}", sign, abs / 1000, abs % 1000)
}
