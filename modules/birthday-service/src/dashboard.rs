//! Dashboard HTML page handler for the birthday bot.

use crate::format;
use crate::recurrence::{self, AnnotatedBirthday};
use crate::routes::AppState;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use std::sync::Arc;

pub async fn dashboard(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let stats = state.db.get_stats().ok();
    let records = state.db.list_all().unwrap_or_default();
    let uptime = state.start_time.elapsed().as_secs();
    let today = state.clock.today();

    let stats_html = if let Some(s) = &stats {
        format!(
            r#"<div class="stats">
                <div class="stat"><span class="val">{}</span><span class="lbl">Birthdays</span></div>
                <div class="stat green"><span class="val">{}</span><span class="lbl">Chats</span></div>
                <div class="stat yellow"><span class="val">{}</span><span class="lbl">Salutations Sent</span></div>
            </div>"#,
            s.total_birthdays, s.chat_count, s.notifications_sent
        )
    } else {
        "<p>No stats available.</p>".to_string()
    };

    let mut items: Vec<AnnotatedBirthday> = Vec::with_capacity(records.len());
    let mut broken_chips = String::new();
    for record in records {
        match recurrence::annotate(vec![record.clone()], today) {
            Ok(annotated) => items.extend(annotated),
            Err(e) => broken_chips.push_str(&format!(
                "<span class=\"chip\">{} ({})</span>\n",
                html_escape(&record.name),
                html_escape(&e.to_string())
            )),
        }
    }
    format::sort_closest(&mut items);

    let mut rows = String::new();
    let mut today_chips = String::new();
    for item in &items {
        rows.push_str(&format!(
            "<tr><td>{}</td><td class=\"mono\">{}</td><td class=\"mono\">{}</td><td>{}</td><td>{}</td></tr>\n",
            html_escape(&item.record.name),
            item.record.chat_id,
            format::format_date(item.date),
            item.turning_age,
            format::relative_days(item.days_until_next),
        ));
        if item.days_until_next == 0 {
            today_chips.push_str(&format!(
                "<span class=\"chip\">🎂 {}</span>\n",
                html_escape(&item.record.name)
            ));
        }
    }
    if rows.is_empty() {
        rows = "<tr><td colspan=\"5\">No birthdays yet.</td></tr>".to_string();
    }

    let uptime_str = format_uptime(uptime);
    let telegram = if state.telegram.is_some() { "connected" } else { "disabled" };

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="pt">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Birthday Bot Dashboard</title>
<style>
  * {{ margin: 0; padding: 0; box-sizing: border-box; }}
  body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background: #0f1117; color: #e0e0e0; padding: 20px; }}
  h1 {{ color: #e8a33d; margin-bottom: 8px; }}
  .meta {{ color: #8b949e; font-size: 0.85em; margin-bottom: 20px; }}
  .stats {{ display: flex; gap: 16px; margin-bottom: 24px; flex-wrap: wrap; }}
  .stat {{ background: #161b22; border: 1px solid #30363d; border-radius: 8px; padding: 16px 24px; text-align: center; min-width: 140px; }}
  .stat .val {{ display: block; font-size: 2em; font-weight: bold; color: #e8a33d; }}
  .stat.green .val {{ color: #3fb950; }}
  .stat.yellow .val {{ color: #d29922; }}
  .stat .lbl {{ display: block; font-size: 0.85em; color: #8b949e; margin-top: 4px; }}
  table {{ width: 100%; border-collapse: collapse; margin-bottom: 24px; }}
  th {{ background: #161b22; color: #8b949e; text-align: left; padding: 8px 12px; font-size: 0.85em; text-transform: uppercase; border-bottom: 1px solid #30363d; }}
  td {{ padding: 8px 12px; border-bottom: 1px solid #21262d; font-size: 0.9em; }}
  tr:hover {{ background: #161b22; }}
  .mono {{ font-family: 'SF Mono', 'Consolas', monospace; font-size: 0.85em; }}
  h2 {{ color: #c9d1d9; margin-bottom: 12px; font-size: 1.1em; }}
  .section {{ margin-bottom: 28px; }}
  .chip {{ display: inline-block; background: #21262d; border: 1px solid #30363d; color: #8b949e; padding: 4px 10px; border-radius: 12px; font-size: 0.8em; margin: 3px; }}
</style>
</head>
<body>
  <h1>Birthday Bot</h1>
  <p class="meta">Today: {today} · Uptime: {uptime_str} · Telegram: {telegram}</p>

  {stats_html}

  {today_section}

  <div class="section">
    <h2>Upcoming</h2>
    <table>
      <thead><tr><th>Name</th><th>Chat</th><th>Born</th><th>Turning</th><th>When</th></tr></thead>
      <tbody>{rows}</tbody>
    </table>
  </div>

  {broken_section}

  <script>setTimeout(() => location.reload(), 30000);</script>
</body>
</html>"#,
        today = format::format_date(today),
        uptime_str = uptime_str,
        telegram = telegram,
        stats_html = stats_html,
        rows = rows,
        today_section = section("Today", &today_chips),
        broken_section = section("Unreadable Records", &broken_chips),
    );

    ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], html)
}

fn section(title: &str, chips: &str) -> String {
    if chips.is_empty() {
        return String::new();
    }
    format!(
        r#"<div class="section"><h2>{}</h2><div>{}</div></div>"#,
        title, chips
    )
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn format_uptime(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
