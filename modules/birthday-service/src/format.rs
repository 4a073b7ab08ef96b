//! Ordering and pt-PT rendering of annotated birthdays.
//!
//! Output is Telegram legacy Markdown: names are escaped, and a name with an
//! external id becomes a `tg://user` mention.

use crate::recurrence::AnnotatedBirthday;
use birthday_types::BirthdayRecord;
use chrono::{Datelike, NaiveDate};

const MONTHS_PT: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pronoun {
    Masculine,
    Feminine,
    Unspecified,
}

impl Pronoun {
    pub fn from_stored(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("m" | "o" | "ele" | "masculino" | "he") => Pronoun::Masculine,
            Some("f" | "a" | "ela" | "feminino" | "she") => Pronoun::Feminine,
            _ => Pronoun::Unspecified,
        }
    }

    /// Contraction of "de" with the definite article.
    pub fn of_article(self) -> &'static str {
        match self {
            Pronoun::Masculine => "do",
            Pronoun::Feminine => "da",
            Pronoun::Unspecified => "de",
        }
    }
}

/// `21 ago 1951`
pub fn format_date(date: NaiveDate) -> String {
    format!(
        "{:02} {} {}",
        date.day(),
        MONTHS_PT[date.month0() as usize],
        date.year()
    )
}

pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Text placed inside a link or bold entity. Escapes are not processed
/// there, so entity delimiters are dropped instead.
pub fn entity_text(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '*' | '[' | ']'))
        .collect()
}

/// The Telegram user id to mention, when the record carries a usable one.
pub fn mention_id(record: &BirthdayRecord) -> Option<i64> {
    record.external_id.as_deref()?.trim().parse().ok()
}

/// The name as shown in chat: a mention when an external id is known.
pub fn display_name(record: &BirthdayRecord) -> String {
    match mention_id(record) {
        Some(id) => format!("[{}](tg://user?id={})", entity_text(&record.name), id),
        None => escape_markdown(&record.name),
    }
}

/// Closest first. Stable, so ties keep the input order.
pub fn sort_closest(items: &mut [AnnotatedBirthday]) {
    items.sort_by_key(|a| a.days_until_next);
}

/// Calendar order by month and day; year (oldest first) breaks ties.
pub fn sort_calendar(items: &mut [AnnotatedBirthday]) {
    items.sort_by_key(|a| (a.date.month(), a.date.day(), a.date.year()));
}

/// The most imminent birthday; the earliest input wins ties.
pub fn next_occasion(items: &[AnnotatedBirthday]) -> Option<&AnnotatedBirthday> {
    items.iter().min_by_key(|a| a.days_until_next)
}

pub fn age_line(item: &AnnotatedBirthday) -> String {
    format!(
        "{} — {}, {}",
        format_date(item.date),
        display_name(&item.record),
        item.current_age.floor() as u32
    )
}

pub fn birthday_line(item: &AnnotatedBirthday) -> String {
    format!(
        "{} — {} — {} dias",
        format_date(item.date),
        display_name(&item.record),
        item.days_until_next
    )
}

pub fn relative_days(days: u32) -> String {
    match days {
        0 => "hoje".to_string(),
        1 => "dentro de 1 dia".to_string(),
        n => format!("dentro de {} dias", n),
    }
}

pub fn next_birthday(item: &AnnotatedBirthday) -> String {
    let pronoun = Pronoun::from_stored(item.record.pronoun.as_deref());
    format!(
        "O próximo aniversário é {} {}, que faz {} anos {}.",
        pronoun.of_article(),
        display_name(&item.record),
        item.turning_age,
        relative_days(item.days_until_next)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurrence::annotate;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn record(id: i64, name: &str, date: &str) -> BirthdayRecord {
        BirthdayRecord {
            id,
            chat_id: -100,
            name: name.to_string(),
            date: date.to_string(),
            external_id: None,
            pronoun: None,
            created_at: String::new(),
        }
    }

    fn family() -> Vec<BirthdayRecord> {
        vec![
            record(1, "Avó Madá", "1951-08-21"),
            record(2, "Miguel", "1977-07-17"),
            record(3, "Ricardo", "1980-07-01"),
            record(4, "Julia", "1986-03-06"),
            record(5, "Madalena", "1995-09-23"),
        ]
    }

    fn names(items: &[AnnotatedBirthday]) -> Vec<&str> {
        items.iter().map(|a| a.record.name.as_str()).collect()
    }

    #[test]
    fn test_format_date_pt() {
        assert_eq!(format_date(d("1951-08-21")), "21 ago 1951");
        assert_eq!(format_date(d("1980-07-01")), "01 jul 1980");
        assert_eq!(format_date(d("1995-09-23")), "23 set 1995");
    }

    #[test]
    fn test_sort_closest_puts_today_first() {
        let mut items = annotate(family(), d("2023-07-01")).unwrap();
        sort_closest(&mut items);
        assert_eq!(
            names(&items),
            vec!["Ricardo", "Miguel", "Avó Madá", "Madalena", "Julia"]
        );
        assert_eq!(items[0].days_until_next, 0);
    }

    #[test]
    fn test_sort_closest_is_stable_on_ties() {
        let records = vec![
            record(1, "Zé", "1990-05-05"),
            record(2, "Ana", "1970-05-05"),
            record(3, "Rui", "2000-05-05"),
        ];
        let mut items = annotate(records, d("2024-01-01")).unwrap();
        sort_closest(&mut items);
        assert_eq!(names(&items), vec!["Zé", "Ana", "Rui"]);
    }

    #[test]
    fn test_sort_calendar_ignores_year() {
        let records = vec![
            record(1, "Madalena", "1995-08-21"),
            record(2, "Julia", "1986-03-06"),
            record(3, "Avó Madá", "1951-08-21"),
        ];
        let mut items = annotate(records, d("2024-01-01")).unwrap();
        sort_calendar(&mut items);
        assert_eq!(names(&items), vec!["Julia", "Avó Madá", "Madalena"]);
    }

    #[test]
    fn test_age_and_birthday_lines() {
        let items = annotate(vec![record(1, "Avó Madá", "1951-08-21")], d("2023-08-20")).unwrap();
        assert_eq!(age_line(&items[0]), "21 ago 1951 — Avó Madá, 71");
        assert_eq!(birthday_line(&items[0]), "21 ago 1951 — Avó Madá — 1 dias");
    }

    #[test]
    fn test_next_birthday_in_days() {
        let mut r = record(3, "Ricardo", "1980-07-01");
        r.pronoun = Some("m".to_string());
        let items = annotate(vec![r], d("2024-01-01")).unwrap();
        assert_eq!(
            next_birthday(&items[0]),
            "O próximo aniversário é do Ricardo, que faz 44 anos dentro de 182 dias."
        );
    }

    #[test]
    fn test_next_birthday_today_with_mention() {
        let mut r = record(3, "Ricardo", "1980-07-01");
        r.external_id = Some("4242".to_string());
        let items = annotate(vec![r], d("2024-07-01")).unwrap();
        assert_eq!(
            next_birthday(&items[0]),
            "O próximo aniversário é de [Ricardo](tg://user?id=4242), que faz 44 anos hoje."
        );
    }

    #[test]
    fn test_next_occasion() {
        let items = annotate(family(), d("2024-03-07")).unwrap();
        let next = next_occasion(&items).unwrap();
        assert_eq!(next.record.name, "Ricardo");
        assert!(next_occasion(&[]).is_none());
    }

    #[test]
    fn test_escape_and_pronoun() {
        assert_eq!(escape_markdown("a_b*c"), "a\\_b\\*c");
        assert_eq!(Pronoun::from_stored(Some(" F ")), Pronoun::Feminine);
        assert_eq!(Pronoun::from_stored(Some("x")), Pronoun::Unspecified);
        assert_eq!(Pronoun::from_stored(None).of_article(), "de");
        assert_eq!(relative_days(1), "dentro de 1 dia");
    }

    #[test]
    fn test_mention_keeps_name_literal() {
        let mut r = record(1, "Ana_Rita [Tia]", "1990-05-05");
        assert_eq!(display_name(&r), "Ana\\_Rita \\[Tia]");
        r.external_id = Some(" 42 ".to_string());
        assert_eq!(display_name(&r), "[Ana_Rita Tia](tg://user?id=42)");
        r.external_id = Some("42) [x".to_string());
        assert_eq!(mention_id(&r), None);
    }
}
