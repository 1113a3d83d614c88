//! Rupee amounts are stored in paise at the gateway and in rupees locally.

pub const DEFAULT_GST_RATE: f64 = 18.0;

pub fn minor_to_major(minor: i64) -> f64 {
    minor as f64 / 100.0
}

pub fn major_to_minor(major: f64) -> i64 {
    (major * 100.0).round() as i64
}

/// Formats an amount the way `en-IN` locales print rupees: `₹1,23,456.5`.
/// At most two fraction digits, trailing zeros dropped.
pub fn format_inr(amount: f64) -> String {
    let paise = (amount.abs() * 100.0).round() as u64;
    let whole = paise / 100;
    let fraction = paise % 100;

    let mut out = String::new();
    if amount < 0.0 && paise > 0 {
        out.push('-');
    }
    out.push('₹');
    out.push_str(&group_indian(whole));
    if fraction > 0 {
        let digits = format!("{:02}", fraction);
        out.push('.');
        out.push_str(digits.trim_end_matches('0'));
    }
    out
}

/// Short form used in dashboards: crore, lakh and thousand suffixes.
pub fn format_compact_inr(amount: f64) -> String {
    if amount >= 10_000_000.0 {
        format!("₹{:.1}Cr", amount / 10_000_000.0)
    } else if amount >= 100_000.0 {
        format!("₹{:.1}L", amount / 100_000.0)
    } else if amount >= 1_000.0 {
        format!("₹{:.1}K", amount / 1_000.0)
    } else {
        format_inr(amount)
    }
}

pub fn gst_amount(amount: f64, rate: f64) -> f64 {
    amount * rate / 100.0
}

pub fn total_with_gst(amount: f64, rate: f64) -> f64 {
    amount + gst_amount(amount, rate)
}

// 1234567 -> "12,34,567": last three digits, then pairs.
fn group_indian(n: u64) -> String {
    let digits = n.to_string();
    if digits.len() <= 3 {
        return digits;
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups = Vec::new();
    let mut rest = head;
    while rest.len() > 2 {
        let (h, t) = rest.split_at(rest.len() - 2);
        groups.push(t);
        rest = h;
    }
    if !rest.is_empty() {
        groups.push(rest);
    }
    groups.reverse();

    format!("{},{}", groups.join(","), tail)
}
