// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Yen amounts as shown in and typed into numeric cells.

/// Accepts `12300`, `12,300`, `¥12,300` and the full-width `￥` prefix.
pub fn parse_amount(input: &str) -> Option<f64> {
    let trimmed = input.trim();
    let unsigned = trimmed
        .strip_prefix('¥')
        .or_else(|| trimmed.strip_prefix('￥'))
        .unwrap_or(trimmed);
    let clean = unsigned.replace(',', "");
    if clean.is_empty() {
        return None;
    }
    clean.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Groups the integer part with commas; fractional parts are kept as typed.
pub fn format_amount(value: f64) -> String {
    if value.fract() != 0.0 {
        return value.to_string();
    }
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}{}", comma_format(value.abs() as u64))
}

fn comma_format(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
