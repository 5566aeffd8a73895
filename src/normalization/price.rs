//! Price text → decimal value
//!
//! Handles currency symbols, `.` or `,` decimal separators and thousands
//! separators of either kind. Unparseable text yields `None`.

/// Parse a scraped price such as `"£52.98"`, `"52,98 €"` or `"1.234,50"`.
pub fn parse_price(raw: &str) -> Option<f64> {
    let mut kept = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        match c {
            '0'..='9' | ',' | '.' => kept.push(c),
            '-' if kept.is_empty() => kept.push(c),
            _ => {}
        }
    }

    let commas = kept.matches(',').count();
    let periods = kept.matches('.').count();

    let mut s = if commas == 1 && periods == 0 {
        kept.replace(',', ".")
    } else {
        kept
    };

    if s.matches('.').count() > 1 {
        s = keep_last_separator(&s, '.');
    }
    if s.matches(',').count() > 1 {
        s = keep_last_separator(&s, ',');
    }

    // Both kinds left: the right-most one is the decimal separator.
    if let (Some(comma), Some(period)) = (s.rfind(','), s.rfind('.')) {
        s = if comma > period {
            s.replace('.', "")
        } else {
            s.replace(',', "")
        };
    }
    let s = s.replace(',', ".");

    s.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Drop every `sep` except the last one, which becomes the decimal point.
fn keep_last_separator(s: &str, sep: char) -> String {
    match s.rfind(sep) {
        Some(last) => {
            let (head, tail) = s.split_at(last);
            format!("{}.{}", head.replace(sep, ""), &tail[sep.len_utf8()..])
        }
        None => s.to_string(),
    }
}

/// Round half away from zero to two fractional digits.
pub fn round_price(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
