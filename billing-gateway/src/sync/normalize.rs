//! Conversion of export rows into [`TransactionRecord`]s.
//!
//! The gateway reports timestamps as `MM-DD-YYYY HH:MM:SS` in its local time,
//! card brands as media codes such as `VISA-D`, and amounts in minor units.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use super::model::{BillingProfile, TransactionRecord};
use crate::{
    error::{GatewayError, Result},
    export::Row,
};

/// Export column names.
pub mod columns {
    /// Gateway transaction id.
    pub const TRANS_ID: &str = "transid";
    /// Transaction timestamp.
    pub const TRANS_DATE: &str = "trans_date";
    /// Amount columns, most specific first.
    pub const AMOUNT: &[&str] = &["bank_amount", "amount"];
    /// Action name columns, most specific first.
    pub const KIND: &[&str] = &["action_name", "action"];
    /// Card brand columns, most specific first.
    pub const MEDIA: &[&str] = &["media_name", "media"];
    /// Masked card number.
    pub const CC: &str = "cc";
    /// Cardholder name.
    pub const NAME: &str = "name";
}

const TIMESTAMP_FORMAT: &str = "%m-%d-%Y %H:%M:%S";
const DATE_FORMAT: &str = "%m-%d-%Y";

/// Media code fragments and the brand each one maps to, checked in order.
const CARD_BRANDS: &[(&str, &str)] = &[
    ("VISA", "Visa"),
    ("MC", "MasterCard"),
    ("AMEX", "American Express"),
    ("DISC", "Discover"),
    ("DINERS", "Diners Club"),
];

/// Maps a gateway media code to a card brand name.
///
/// Matching is a case-insensitive substring test; unknown codes pass through.
///
/// # Examples
///
/// ```
/// use billing_gateway::sync::card_brand;
///
/// assert_eq!(card_brand("VISA-D"), "Visa");
/// assert_eq!(card_brand("mc-d"), "MasterCard");
/// assert_eq!(card_brand("JCB"), "JCB");
/// ```
#[must_use]
pub fn card_brand(code: &str) -> String {
    let upper = code.to_ascii_uppercase();
    CARD_BRANDS
        .iter()
        .find(|(fragment, _)| upper.contains(fragment))
        .map_or_else(|| code.to_owned(), |(_, brand)| (*brand).to_owned())
}

/// Parses a gateway timestamp; a bare date means midnight.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidInput`] for any other format.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .or_else(|_| {
            NaiveDate::parse_from_str(value, DATE_FORMAT)
                .map(|date| date.and_time(chrono::NaiveTime::MIN))
        })
        .map_err(|e| {
            GatewayError::InvalidInput(format!("bad transaction timestamp {value:?}: {e}"))
        })
}

/// Parses an amount into major units with two decimal places.
///
/// Integers are minor units (`1200` is `12.00`); a value with a decimal point
/// is already in major units.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidInput`] if the value is not a number.
pub fn parse_amount(value: &str) -> Result<Decimal> {
    let value = value.trim();
    let invalid = |e: &dyn std::fmt::Display| {
        GatewayError::InvalidInput(format!("bad transaction amount {value:?}: {e}"))
    };

    let mut amount = if value.contains('.') {
        Decimal::from_str(value).map_err(|e| invalid(&e))?
    } else {
        let minor = value.parse::<i64>().map_err(|e| invalid(&e))?;
        Decimal::new(minor, 2)
    };
    amount.rescale(2);
    Ok(amount)
}

/// Builds the record for one export row.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidInput`] when the row lacks a transaction id,
/// timestamp or amount, or when either of the latter two does not parse.
pub fn transaction_from_row(profile: &BillingProfile, row: &Row<'_>) -> Result<TransactionRecord> {
    let missing = |column: &str| GatewayError::InvalidInput(format!("row has no {column}"));

    let transaction_id = row.get(columns::TRANS_ID).ok_or_else(|| missing(columns::TRANS_ID))?;
    let transaction_date =
        parse_timestamp(row.get(columns::TRANS_DATE).ok_or_else(|| missing(columns::TRANS_DATE))?)?;
    let amount = parse_amount(row.get_any(columns::AMOUNT).ok_or_else(|| missing("amount"))?)?;

    Ok(TransactionRecord {
        profile_id: profile.id,
        account_id: profile.account_id,
        transaction_id: transaction_id.to_owned(),
        transaction_date,
        transaction_kind: row.get_any(columns::KIND).map(str::to_owned),
        amount,
        card_fragment: row.get(columns::CC).map(str::to_owned),
        card_brand: row.get_any(columns::MEDIA).map(card_brand),
        cardholder_name: row.get(columns::NAME).map(str::to_owned),
    })
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveTime, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::export::TabularExport;

    #[test]
    fn test_card_brand_mapping() {
        assert_eq!(card_brand("VISA-D"), "Visa");
        assert_eq!(card_brand("MC-D"), "MasterCard");
        assert_eq!(card_brand("AMEX-D"), "American Express");
        assert_eq!(card_brand("disc"), "Discover");
        assert_eq!(card_brand("DINERS-C"), "Diners Club");
        assert_eq!(card_brand("visa"), "Visa");
        assert_eq!(card_brand("JCB-D"), "JCB-D");
        assert_eq!(card_brand(""), "");
    }

    #[test]
    fn test_parse_timestamp() {
        let expected = NaiveDate::from_ymd_opt(2008, 10, 6)
            .unwrap()
            .and_hms_opt(14, 2, 11)
            .unwrap();
        assert_eq!(parse_timestamp("10-06-2008 14:02:11").unwrap(), expected);
    }

    #[test]
    fn test_parse_date_only_is_midnight() {
        let parsed = parse_timestamp("10-06-2008").unwrap();
        assert_eq!(parsed.time(), NaiveTime::MIN);
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2008, 10, 6).unwrap());
    }

    #[test]
    fn test_parse_timestamp_rejects_other_formats() {
        assert!(parse_timestamp("2008-10-06 14:02:11").is_err());
        assert!(parse_timestamp("13-40-2008").is_err());
        assert!(parse_timestamp("").is_err());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1200").unwrap().to_string(), "12.00");
        assert_eq!(parse_amount("5").unwrap().to_string(), "0.05");
        assert_eq!(parse_amount("-250").unwrap().to_string(), "-2.50");
        assert_eq!(parse_amount("12.5").unwrap().to_string(), "12.50");
        assert!(parse_amount("twelve").is_err());
        assert!(parse_amount("").is_err());
    }

    fn profile() -> BillingProfile {
        BillingProfile::new(Uuid::new_v4(), None, Utc::now(), 1200)
    }

    #[test]
    fn test_transaction_from_full_row() {
        let export = TabularExport::new(
            "transid,trans_date,action_name,bank_amount,amount,cc,media_name,name\n\
             025-0000083216,10-06-2008 14:02:11,sale,1200,999,411111******1111,VISA-D,Jane Doe\n",
        );
        let parsed = export.parse().unwrap();
        let profile = profile();

        let record = transaction_from_row(&profile, &parsed.rows().next().unwrap()).unwrap();
        assert_eq!(record.profile_id, profile.id);
        assert_eq!(record.account_id, profile.account_id);
        assert_eq!(record.transaction_id, "025-0000083216");
        assert_eq!(record.transaction_kind.as_deref(), Some("sale"));
        assert_eq!(record.amount, Decimal::new(1200, 2));
        assert_eq!(record.card_fragment.as_deref(), Some("411111******1111"));
        assert_eq!(record.card_brand.as_deref(), Some("Visa"));
        assert_eq!(record.cardholder_name.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn test_transaction_from_minimal_row() {
        let export = TabularExport::new("transid,trans_date,amount,cc\nA-1,10-06-2008,100,1111\n");
        let parsed = export.parse().unwrap();

        let record = transaction_from_row(&profile(), &parsed.rows().next().unwrap()).unwrap();
        assert_eq!(record.amount.to_string(), "1.00");
        assert_eq!(record.transaction_kind, None);
        assert_eq!(record.card_brand, None);
        assert_eq!(record.card_fragment.as_deref(), Some("1111"));
    }

    #[test]
    fn test_transaction_requires_id_date_and_amount() {
        let export = TabularExport::new(
            "transid,trans_date,amount\n\
             ,10-06-2008,100\n\
             A-2,,100\n\
             A-3,10-06-2008,\n\
             A-4,yesterday,100\n",
        );
        let parsed = export.parse().unwrap();
        let profile = profile();

        for row in parsed.rows() {
            assert!(matches!(
                transaction_from_row(&profile, &row),
                Err(GatewayError::InvalidInput(_))
            ));
        }
    }
}
