//! Congratulation messages sent on the day of a birthday.

use crate::format::{display_name, entity_text, escape_markdown, mention_id};
use crate::recurrence::AnnotatedBirthday;
use rand::Rng;

type Salutation = fn(&str, &str, u32) -> String;

const SALUTATIONS: [Salutation; 3] = [baby_of_the_day, their_day, epic_day];

fn baby_of_the_day(who: &str, name: &str, age: u32) -> String {
    format!(
        "🎂 O bebé de hoje é {} que faz {} anos! 🥳🎉 Parabéns {}, FELICIDADE SEM FIM ❤️❤️❤️",
        who, age, name
    )
}

fn their_day(who: &str, name: &str, age: u32) -> String {
    format!(
        "🎂 Hoje é o dia de {} que celebra {} anos! 🥳🎉 Muitos parabéns {}, FELICIDADE SEM FIM ❤️❤️❤️",
        who, age, name
    )
}

fn epic_day(who: &str, name: &str, age: u32) -> String {
    format!(
        "🎂 Que dia épico! {} faz anos e conta já com {} aninhos! 🥳🎉 Parabéns {}, FELICIDADE SEM FIM ❤️❤️❤️",
        who, age, name
    )
}

pub fn count() -> usize {
    SALUTATIONS.len()
}

/// Render salutation `index` (wrapping) for a birthday happening today.
pub fn render(index: usize, item: &AnnotatedBirthday) -> String {
    let highlighted = if mention_id(&item.record).is_some() {
        display_name(&item.record)
    } else {
        format!("*{}*", entity_text(&item.record.name))
    };
    let plain = escape_markdown(&item.record.name);
    SALUTATIONS[index % SALUTATIONS.len()](&highlighted, &plain, item.turning_age)
}

/// Render a randomly chosen salutation.
pub fn random(item: &AnnotatedBirthday) -> String {
    let index = rand::thread_rng().gen_range(0..count());
    render(index, item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurrence::annotate;
    use birthday_types::BirthdayRecord;
    use chrono::NaiveDate;

    fn today_item(external_id: Option<&str>) -> AnnotatedBirthday {
        named_today_item("Julia", external_id)
    }

    fn named_today_item(name: &str, external_id: Option<&str>) -> AnnotatedBirthday {
        let record = BirthdayRecord {
            id: 1,
            chat_id: -100,
            name: name.to_string(),
            date: "1986-03-06".to_string(),
            external_id: external_id.map(str::to_string),
            pronoun: Some("f".to_string()),
            created_at: String::new(),
        };
        let today = NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();
        annotate(vec![record], today).unwrap().remove(0)
    }

    #[test]
    fn test_render_uses_age_turned_today() {
        let msg = render(0, &today_item(None));
        assert!(msg.starts_with("🎂 O bebé de hoje é *Julia* que faz 38 anos!"));
        assert!(msg.contains("Parabéns Julia,"));
    }

    #[test]
    fn test_render_wraps_index_and_mentions() {
        let msg = render(count() + 1, &today_item(Some("77")));
        assert!(msg.contains("Hoje é o dia de [Julia](tg://user?id=77) que celebra 38 anos"));
    }

    #[test]
    fn test_bold_name_is_not_escaped() {
        let msg = render(0, &named_today_item("Ana_Rita*", None));
        assert!(msg.contains("é *Ana_Rita* que faz"));
        assert!(msg.contains("Parabéns Ana\\_Rita\\*,"));
    }

    #[test]
    fn test_random_is_one_of_the_templates() {
        let item = today_item(None);
        let msg = random(&item);
        assert!((0..count()).any(|i| render(i, &item) == msg));
    }
}
