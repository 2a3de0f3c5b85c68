/// Sort direction for an ordered select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

pub(crate) fn table_url(base: &str, table: &str) -> String {
    format!("{}/rest/v1/{}", base.trim_end_matches('/'), table)
}

pub(crate) fn eq(column: &str, value: &str) -> (String, String) {
    (column.to_string(), format!("eq.{value}"))
}

pub(crate) fn order(column: &str, direction: Direction) -> (String, String) {
    ("order".to_string(), format!("{}.{}", column, direction.as_str()))
}
