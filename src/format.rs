//! Pure display formatting for prices and receiver phone numbers.

#[derive(Debug, Clone)]
pub struct PriceFormatter {
    symbol: String,
    fraction_digits: usize,
}

impl Default for PriceFormatter {
    fn default() -> Self {
        Self::new("$")
    }
}

impl PriceFormatter {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            fraction_digits: 2,
        }
    }

    /// Formats an amount as `$1,234.50`.
    pub fn format(&self, amount: f64) -> String {
        let rendered = format!("{:.*}", self.fraction_digits, amount.abs());
        let (whole, fraction) = match rendered.split_once('.') {
            Some((whole, fraction)) => (whole, Some(fraction)),
            None => (rendered.as_str(), None),
        };
        let is_zero = rendered.chars().all(|c| c == '0' || c == '.');
        let sign = if amount < 0.0 && !is_zero { "-" } else { "" };
        let grouped = group_thousands(whole);
        match fraction {
            Some(fraction) => format!("{sign}{}{grouped}.{fraction}", self.symbol),
            None => format!("{sign}{}{grouped}", self.symbol),
        }
    }
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut grouped = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Converts between user input, E.164 and a masked display form.
///
/// The mask uses `X` for each national digit, e.g. `(XXX) XXX-XXXX`.
#[derive(Debug, Clone)]
pub struct PhoneFormatter {
    country_code: String,
    mask: String,
}

impl Default for PhoneFormatter {
    fn default() -> Self {
        Self::new("1", "(XXX) XXX-XXXX")
    }
}

impl PhoneFormatter {
    pub fn new(country_code: impl Into<String>, mask: impl Into<String>) -> Self {
        Self {
            country_code: digits(&country_code.into()),
            mask: mask.into(),
        }
    }

    fn national_len(&self) -> usize {
        self.mask.chars().filter(|c| *c == 'X').count()
    }

    /// Normalizes free-form input to E.164, or `None` if it has the wrong length.
    pub fn to_e164(&self, input: &str) -> Option<String> {
        let digits = digits(input);
        let national_len = self.national_len();
        if digits.len() == national_len {
            return Some(format!("+{}{digits}", self.country_code));
        }
        if digits.len() == self.country_code.len() + national_len
            && digits.starts_with(&self.country_code)
        {
            return Some(format!("+{digits}"));
        }
        None
    }

    /// Renders an E.164 number through the mask. Numbers from another country
    /// or with an unexpected length are returned unchanged.
    pub fn display(&self, e164: &str) -> String {
        let digits = digits(e164);
        let national = match digits.strip_prefix(self.country_code.as_str()) {
            Some(national) if national.len() == self.national_len() => national,
            _ => return e164.to_string(),
        };

        let mut national_digits = national.chars();
        let masked: String = self
            .mask
            .chars()
            .map(|c| match c {
                'X' => national_digits.next().unwrap_or(' '),
                other => other,
            })
            .collect();
        format!("+{} {masked}", self.country_code)
    }
}

/// Keeps only ASCII digits.
pub fn digits(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}
