//! Amount extraction and message classification
//!
//! Extraction runs two ordered passes over the message text:
//! 1. Item matchers ("lunch 4.50", "lunch $4.50", "lunch 4.50 euros") yield
//!    labelled amounts. Each new amount is recorded once, with its label.
//! 2. Bare matchers ("4.50", "$4.50", "4.50 dollars") scan the whole text again
//!    and add any amount not seen yet, without a label.
//!
//! Amounts are compared by their normalized rendering, so "25.50" and "$25.5"
//! are the same amount.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};

/// A labelled amount found by an item matcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedItem {
    /// Lowercased label, e.g. "coffee"
    pub label: String,
    /// Normalized amount, e.g. "3.25"
    pub amount: String,
    /// Label and amount as written, e.g. "coffee 3.25"
    pub original: String,
}

/// Result of running both passes over a message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    /// Unique normalized amounts in first-seen order
    pub numbers: Vec<String>,
    /// One entry per item match that contributed a new amount
    pub items: Vec<ExtractedItem>,
}

impl Extraction {
    fn push_number(&mut self, number: &str) -> bool {
        if self.numbers.iter().any(|n| n == number) {
            return false;
        }
        self.numbers.push(number.to_string());
        true
    }
}

/// Spending category, first keyword match wins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Food & Dining")]
    FoodAndDining,
    Transportation,
    Housing,
    Utilities,
    Shopping,
    Entertainment,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FoodAndDining => "Food & Dining",
            Self::Transportation => "Transportation",
            Self::Housing => "Housing",
            Self::Utilities => "Utilities",
            Self::Shopping => "Shopping",
            Self::Entertainment => "Entertainment",
            Self::Other => "Other",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Category keywords in precedence order
const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (Category::FoodAndDining, &["food", "restaurant", "meal"]),
    (Category::Transportation, &["gas", "fuel", "petrol"]),
    (Category::Housing, &["rent", "mortgage", "housing"]),
    (Category::Utilities, &["bill", "utility", "electric"]),
    (Category::Shopping, &["shopping", "clothes", "store"]),
    (Category::Entertainment, &["entertainment", "movie", "game"]),
];

/// Amounts in this range make a message spending-related without any keyword
const SIGNIFICANT_MIN: f64 = 1.0;
const SIGNIFICANT_MAX: f64 = 10_000.0;

/// Assign a spending category from keywords in the text
pub fn categorize(text: &str) -> Category {
    let lower = text.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Other)
}

/// Clean a sender display name or id
///
/// "+1 555-0100@c.us" becomes "1 555-0100"; "Ana 🍕" becomes "Ana".
pub fn sanitize_sender(raw: &str) -> String {
    let without_plus = raw.strip_prefix('+').unwrap_or(raw);
    let without_domain = match without_plus.find('@') {
        Some(idx) => &without_plus[..idx],
        None => without_plus,
    };
    without_domain
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Normalize a raw amount ("$1,025.50", "12.5 dollars") to its canonical rendering
///
/// Everything but digits, `.` and `-` is dropped. With more than one `.`,
/// only the first two dot-separated segments are kept. Returns `None` unless
/// the result is a positive number. The rendering is Rust's shortest
/// round-trip form, which never uses exponent notation, so 1e36 comes out
/// as the full digit string.
pub fn normalize_amount(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    let mut segments = cleaned.split('.');
    let cleaned = match (segments.next(), segments.next(), segments.next()) {
        (Some(whole), Some(frac), Some(_)) => format!("{}.{}", whole, frac),
        _ => cleaned,
    };

    let value = parse_leading_decimal(&cleaned)?;
    if !value.is_finite() || value <= 0.0 {
        return None;
    }
    Some(value.to_string())
}

/// Parse the longest decimal prefix of `s` ("12.5-3" parses as 12.5)
fn parse_leading_decimal(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let mut end = usize::from(bytes.first() == Some(&b'-'));

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }
    s[..end].parse().ok()
}

/// A raw amount found by a matcher, with its label for item matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Candidate<'t> {
    label: Option<&'t str>,
    raw: &'t str,
}

/// One extraction strategy
#[derive(Debug, Clone)]
enum Matcher {
    /// Group 1 is the label, group 2 the amount
    Item(Regex),
    /// The whole match is the amount
    Bare(Regex),
}

impl Matcher {
    fn candidates<'t>(&self, text: &'t str) -> Result<Vec<Candidate<'t>>> {
        match self {
            Self::Item(re) => re
                .captures_iter(text)
                .map(|caps| match (caps.get(1), caps.get(2)) {
                    (Some(label), Some(amount)) => Ok(Candidate {
                        label: Some(label.as_str()),
                        raw: amount.as_str(),
                    }),
                    _ => Err(Error::Extraction(format!(
                        "item pattern '{}' matched without label and amount groups",
                        re.as_str()
                    ))),
                })
                .collect(),
            Self::Bare(re) => Ok(re
                .find_iter(text)
                .map(|m| Candidate {
                    label: None,
                    raw: m.as_str(),
                })
                .collect()),
        }
    }
}

/// Compiled extraction patterns and spending keywords
#[derive(Debug, Clone)]
pub struct Extractor {
    item_matchers: Vec<Matcher>,
    number_matchers: Vec<Matcher>,
    keywords: Vec<String>,
}

impl Extractor {
    /// Compile the given patterns; fails on the first invalid regex
    pub fn new<S: AsRef<str>>(
        item_patterns: &[S],
        number_patterns: &[S],
        keywords: &[S],
    ) -> Result<Self> {
        let item_matchers = item_patterns
            .iter()
            .map(|p| Ok(Matcher::Item(Regex::new(p.as_ref())?)))
            .collect::<Result<Vec<_>>>()?;
        let number_matchers = number_patterns
            .iter()
            .map(|p| Ok(Matcher::Bare(Regex::new(p.as_ref())?)))
            .collect::<Result<Vec<_>>>()?;
        let keywords = keywords
            .iter()
            .map(|k| k.as_ref().to_lowercase())
            .collect();

        Ok(Self {
            item_matchers,
            number_matchers,
            keywords,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.item_patterns,
            &config.number_patterns,
            &config.spending_keywords,
        )
    }

    /// Run the item pass, then the bare number pass
    pub fn extract(&self, text: &str) -> Result<Extraction> {
        let mut extraction = Extraction::default();

        for matcher in &self.item_matchers {
            for candidate in matcher.candidates(text)? {
                let Some(amount) = normalize_amount(candidate.raw) else {
                    continue;
                };
                if !extraction.push_number(&amount) {
                    continue;
                }
                let label = candidate.label.unwrap_or_default().trim().to_lowercase();
                extraction.items.push(ExtractedItem {
                    original: format!("{} {}", label, candidate.raw),
                    label,
                    amount,
                });
            }
        }

        for number in self.bare_numbers(text) {
            extraction.push_number(&number);
        }

        Ok(extraction)
    }

    /// Unique normalized amounts from the bare number pass alone
    pub fn bare_numbers(&self, text: &str) -> Vec<String> {
        let mut found = Extraction::default();
        for matcher in &self.number_matchers {
            // Bare matchers never fail
            for candidate in matcher.candidates(text).unwrap_or_default() {
                if let Some(amount) = normalize_amount(candidate.raw) {
                    found.push_number(&amount);
                }
            }
        }
        found.numbers
    }

    /// A spending keyword is present, or some amount falls in 1..=10000
    pub fn is_spending_related(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        if self.keywords.iter().any(|k| lower.contains(k.as_str())) {
            return true;
        }

        self.bare_numbers(text)
            .iter()
            .filter_map(|n| n.parse::<f64>().ok())
            .any(|v| (SIGNIFICANT_MIN..=SIGNIFICANT_MAX).contains(&v))
    }
}
