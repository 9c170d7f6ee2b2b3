// src/arabic.rs
//! Arabic-script canonicalization used by keyword matching.
//!
//! Keyword lists are written in one orthographic convention while feeds mix
//! hamza/madda alef forms, teh marbuta vs heh, and optional tashkeel. Folding
//! both sides through [`normalize_arabic`] lets a single list entry match all
//! of those spellings.

/// Strip tashkeel and fold alef/teh-marbuta/alef-maksura variants.
///
/// Rules, in order:
/// 1. drop diacritics U+064B..=U+065F and the superscript alef U+0670
/// 2. `أ` `إ` `آ` → `ا`
/// 3. `ة` → `ه`
/// 4. `ى` → `ي`
///
/// Everything else (including non-Arabic text) passes through unchanged, so
/// the function is idempotent.
pub fn normalize_arabic(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if is_diacritic(ch) {
            continue;
        }
        out.push(fold_char(ch));
    }
    out
}

fn is_diacritic(ch: char) -> bool {
    matches!(ch, '\u{064B}'..='\u{065F}' | '\u{0670}')
}

fn fold_char(ch: char) -> char {
    match ch {
        'أ' | 'إ' | 'آ' => 'ا',
        'ة' => 'ه',
        'ى' => 'ي',
        other => other,
    }
}
