//! Currency domain model
//!
//! The set of supported currencies is closed: a raw amount token is only
//! accepted when it carries one of the markers below, and a report amount is
//! only rendered for one of these symbols.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// Supported booking currencies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "€")]
    Euro,
    #[serde(rename = "£")]
    Pound,
}

impl Currency {
    pub const ALL: [Currency; 2] = [Currency::Euro, Currency::Pound];

    /// Symbol stored in the `currency` column
    pub fn symbol(&self) -> char {
        match self {
            Currency::Euro => '€',
            Currency::Pound => '£',
        }
    }

    /// Look up a currency by its stored symbol
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| symbol.chars().eq(std::iter::once(c.symbol())))
    }

    /// Render an amount the way the monthly report displays it
    ///
    /// Euro amounts use a comma decimal separator followed by the symbol
    /// (`3,03 €`); pound amounts are prefixed (`£19.98`).
    pub fn render(&self, amount: &Decimal) -> String {
        match self {
            Currency::Euro => format!("{} €", amount.to_string().replace('.', ",")),
            Currency::Pound => format!("£{}", amount),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Parse a raw amount token such as `12,34€` or `£12.34`
///
/// The pound marker must lead the token and the euro marker must trail it.
/// A comma is accepted as decimal separator.
pub fn parse_amount_and_currency(raw_amount: &str) -> Result<(Decimal, Currency)> {
    let raw = raw_amount.trim();

    let (currency, rest) = if let Some(rest) = raw.strip_prefix(Currency::Pound.symbol()) {
        (Currency::Pound, rest)
    } else if let Some(rest) = raw.strip_suffix(Currency::Euro.symbol()) {
        (Currency::Euro, rest)
    } else {
        return Err(Error::UnrecognizedCurrency(raw.to_string()));
    };

    // A token carrying both markers keeps the other one here and fails to parse
    let normalized = rest.replace(',', ".");
    let amount = normalized
        .trim()
        .parse::<Decimal>()
        .map_err(|_| Error::UnrecognizedAmount {
            raw: raw.to_string(),
            amount: rest.to_string(),
        })?;

    Ok((amount, currency))
}
