use anyhow::{bail, Result};
use chrono::NaiveDate;

/// Validate a list title: must contain something besides whitespace.
pub fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        bail!("list title must not be empty");
    }
    Ok(())
}

pub fn validate_description(description: &str) -> Result<()> {
    if description.trim().is_empty() {
        bail!("task description must not be empty");
    }
    Ok(())
}

pub fn validate_assignee(assignee: &str) -> Result<()> {
    if assignee.trim().is_empty() {
        bail!("task assignee must not be empty");
    }
    Ok(())
}

/// Validate a due date: a real calendar date written as YYYY-MM-DD, so that
/// lexicographic order of the stored strings is date order.
pub fn validate_due_date(date: &str) -> Result<()> {
    if date.len() != 10 || NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
        bail!("invalid due date '{date}': expected YYYY-MM-DD");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_rejected() {
        assert!(validate_title("Inventário").is_ok());
        assert!(validate_title("").is_err());
        assert!(validate_title("   \t").is_err());
        assert!(validate_description(" \n ").is_err());
        assert!(validate_assignee("").is_err());
        assert!(validate_assignee("Ana").is_ok());
    }

    #[test]
    fn due_dates() {
        assert!(validate_due_date("2024-02-29").is_ok());
        assert!(validate_due_date("2023-02-29").is_err());
        assert!(validate_due_date("2024-1-05").is_err());
        assert!(validate_due_date("05/01/2024").is_err());
        assert!(validate_due_date("").is_err());
    }
}
