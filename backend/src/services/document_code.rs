//! Human-readable document codes (`DST-20241001-00042`)

use chrono::{NaiveDate, Utc};
use sqlx::PgConnection;

use crate::error::AppResult;

/// Documents that carry a sequential code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Distribution,
    Request,
    Procurement,
}

impl DocumentKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            DocumentKind::Distribution => "DST",
            DocumentKind::Request => "REQ",
            DocumentKind::Procurement => "PRC",
        }
    }

    fn sequence(&self) -> &'static str {
        match self {
            DocumentKind::Distribution => "distribution_code_seq",
            DocumentKind::Request => "request_code_seq",
            DocumentKind::Procurement => "procurement_code_seq",
        }
    }
}

pub fn format_document_code(kind: DocumentKind, date: NaiveDate, sequence: i64) -> String {
    format!("{}-{}-{:05}", kind.prefix(), date.format("%Y%m%d"), sequence)
}

/// Draw the next code from the kind's database sequence
pub async fn next_document_code(conn: &mut PgConnection, kind: DocumentKind) -> AppResult<String> {
    let sequence = sqlx::query_scalar::<_, i64>("SELECT nextval($1::regclass)")
        .bind(kind.sequence())
        .fetch_one(conn)
        .await?;

    Ok(format_document_code(kind, Utc::now().date_naive(), sequence))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_document_code() {
        let date = NaiveDate::from_ymd_opt(2024, 10, 1).unwrap();
        assert_eq!(
            format_document_code(DocumentKind::Distribution, date, 42),
            "DST-20241001-00042"
        );
        assert_eq!(
            format_document_code(DocumentKind::Procurement, date, 123456),
            "PRC-20241001-123456"
        );
    }
}
