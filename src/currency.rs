//! Locale-aware currency formatting.
//!
//! Formatting is a pure function of `(amount, currency_code, locale)`; nothing
//! is read from process-wide locale settings. [`CurrencyConfig`] is the
//! validated pairing a dashboard carries around.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::config;
use crate::error::{DashboardError, Result};

const NBSP: &str = "\u{a0}";
const NARROW_NBSP: &str = "\u{202f}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SymbolPosition {
    Prefix,
    Suffix,
}

/// Number conventions for one locale.
#[derive(Debug)]
struct LocaleFormat {
    tag: &'static str,
    decimal: &'static str,
    group: &'static str,
    position: SymbolPosition,
    /// Separator between symbol and digits.
    spacing: &'static str,
    home_currency: &'static str,
}

static LOCALES: [LocaleFormat; 9] = [
    LocaleFormat {
        tag: "en_US",
        decimal: ".",
        group: ",",
        position: SymbolPosition::Prefix,
        spacing: "",
        home_currency: "USD",
    },
    LocaleFormat {
        tag: "en_AU",
        decimal: ".",
        group: ",",
        position: SymbolPosition::Prefix,
        spacing: "",
        home_currency: "AUD",
    },
    LocaleFormat {
        tag: "en_GB",
        decimal: ".",
        group: ",",
        position: SymbolPosition::Prefix,
        spacing: "",
        home_currency: "GBP",
    },
    LocaleFormat {
        tag: "es_CO",
        decimal: ",",
        group: ".",
        position: SymbolPosition::Prefix,
        spacing: NBSP,
        home_currency: "COP",
    },
    LocaleFormat {
        tag: "pt_BR",
        decimal: ",",
        group: ".",
        position: SymbolPosition::Prefix,
        spacing: NBSP,
        home_currency: "BRL",
    },
    LocaleFormat {
        tag: "de_DE",
        decimal: ",",
        group: ".",
        position: SymbolPosition::Suffix,
        spacing: NBSP,
        home_currency: "EUR",
    },
    LocaleFormat {
        tag: "fr_FR",
        decimal: ",",
        group: NARROW_NBSP,
        position: SymbolPosition::Suffix,
        spacing: NBSP,
        home_currency: "EUR",
    },
    LocaleFormat {
        tag: "id_ID",
        decimal: ",",
        group: ".",
        position: SymbolPosition::Prefix,
        spacing: "",
        home_currency: "IDR",
    },
    LocaleFormat {
        tag: "ja_JP",
        decimal: ".",
        group: ",",
        position: SymbolPosition::Prefix,
        spacing: "",
        home_currency: "JPY",
    },
];

/// Supported locale tags, in `language_REGION` form.
pub fn supported_locales() -> Vec<&'static str> {
    LOCALES.iter().map(|l| l.tag).collect()
}

fn find_locale(locale: &str) -> Option<&'static LocaleFormat> {
    let normalized = locale.trim().replace('-', "_");
    LOCALES
        .iter()
        .find(|l| l.tag.eq_ignore_ascii_case(&normalized))
}

fn lookup_locale(locale: &str) -> Result<&'static LocaleFormat> {
    find_locale(locale).ok_or_else(|| {
        DashboardError::InvalidArgument(format!(
            "unsupported locale '{}' (supported: {})",
            locale,
            supported_locales().join(", ")
        ))
    })
}

fn normalize_currency_code(code: &str) -> Result<String> {
    let code = code.trim();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(DashboardError::InvalidArgument(format!(
            "currency code must be three ASCII letters, got '{}'",
            code
        )));
    }
    Ok(code.to_ascii_uppercase())
}

/// Display symbol for an ISO 4217 code. Unknown codes render as themselves.
pub fn currency_symbol(code: &str) -> &str {
    match code {
        "AUD" => "A$",
        "USD" => "$",
        "CAD" => "CA$",
        "NZD" => "NZ$",
        "MXN" => "MX$",
        "GBP" => "£",
        "EUR" => "€",
        "JPY" => "¥",
        "CNY" => "CN¥",
        "INR" => "₹",
        "KRW" => "₩",
        "BRL" => "R$",
        "COP" => "COL$",
        "IDR" => "Rp",
        other => other,
    }
}

/// Number of minor-unit digits shown for a currency.
pub fn minor_digits(code: &str) -> u32 {
    match code {
        "JPY" | "KRW" => 0,
        _ => 2,
    }
}

/// Format `amount` in `currency_code` using the conventions of `locale`.
///
/// Rounds half-to-even to the currency's minor digits. The pairing of
/// currency and locale is not checked here; see [`CurrencyConfig::new`].
///
/// ```rust
/// use order_dashboard::currency::format_currency;
/// use rust_decimal::Decimal;
///
/// let s = format_currency(Decimal::from(35), "AUD", "en_AU").unwrap();
/// assert_eq!(s, "A$35.00");
/// ```
pub fn format_currency(amount: Decimal, currency_code: &str, locale: &str) -> Result<String> {
    let code = normalize_currency_code(currency_code)?;
    let fmt = lookup_locale(locale)?;
    Ok(render(amount, &code, fmt))
}

fn render(amount: Decimal, code: &str, fmt: &LocaleFormat) -> String {
    let digits = minor_digits(code);
    let rounded = amount.round_dp_with_strategy(digits, RoundingStrategy::MidpointNearestEven);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();

    let plain = format!("{:.*}", digits as usize, rounded.abs());
    let (int_part, frac_part) = match plain.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (plain.as_str(), None),
    };

    let mut number = group_digits(int_part, fmt.group);
    if let Some(frac) = frac_part {
        number.push_str(fmt.decimal);
        number.push_str(frac);
    }

    let symbol = currency_symbol(code);
    let sign = if negative { "-" } else { "" };
    match fmt.position {
        SymbolPosition::Prefix => format!("{}{}{}{}", sign, symbol, fmt.spacing, number),
        SymbolPosition::Suffix => format!("{}{}{}{}", sign, number, fmt.spacing, symbol),
    }
}

fn group_digits(int_part: &str, separator: &str) -> String {
    let len = int_part.len();
    let mut out = String::with_capacity(len + len / 3 * separator.len());
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(c);
    }
    out
}

// ---------------------------------------------------------------------------
// CurrencyConfig
// ---------------------------------------------------------------------------

/// A validated `(currency_code, locale)` pair used to format revenue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrencyConfig {
    currency_code: String,
    locale: String,
}

impl CurrencyConfig {
    /// Pair a currency with a locale whose home currency it is.
    ///
    /// Returns [`DashboardError::InvalidArgument`] for an unknown locale, a
    /// malformed code, or a code foreign to the locale. Use
    /// [`CurrencyConfig::foreign`] to format a foreign currency on purpose.
    pub fn new(currency_code: &str, locale: &str) -> Result<Self> {
        let code = normalize_currency_code(currency_code)?;
        let fmt = lookup_locale(locale)?;
        if fmt.home_currency != code {
            return Err(DashboardError::InvalidArgument(format!(
                "currency {} does not match locale {} (expects {}); \
                 use CurrencyConfig::foreign to pair them anyway",
                code, fmt.tag, fmt.home_currency
            )));
        }
        Ok(Self {
            currency_code: code,
            locale: fmt.tag.to_string(),
        })
    }

    /// Pair any well-formed currency code with a supported locale.
    pub fn foreign(currency_code: &str, locale: &str) -> Result<Self> {
        let code = normalize_currency_code(currency_code)?;
        let fmt = lookup_locale(locale)?;
        if fmt.home_currency != code {
            tracing::debug!(
                currency = %code,
                locale = fmt.tag,
                "Formatting foreign currency"
            );
        }
        Ok(Self {
            currency_code: code,
            locale: fmt.tag.to_string(),
        })
    }

    pub fn currency_code(&self) -> &str {
        &self.currency_code
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn format(&self, amount: Decimal) -> Result<String> {
        format_currency(amount, &self.currency_code, &self.locale)
    }
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            currency_code: config::DEFAULT_CURRENCY.to_string(),
            locale: config::DEFAULT_LOCALE.to_string(),
        }
    }
}
