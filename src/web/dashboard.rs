use std::{collections::BTreeMap, sync::Arc};

use axum::{extract::State, response::Html};
use chrono::{DateTime, Utc};

use crate::ticket::types::{ArchivedTicket, TicketKind, TicketStats, TicketStatus, TranscriptMessage};
use crate::web::{ApiError, AppState};

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; background: #f3f4f6; color: #111827; margin: 0; }
main { max-width: 1100px; margin: 0 auto; padding: 2rem 1rem; }
h1 { margin-top: 0; }
.cards { display: grid; grid-template-columns: repeat(auto-fit, minmax(150px, 1fr)); gap: 1rem; }
.card, .ticket { background: #fff; border-radius: 8px; box-shadow: 0 1px 3px rgba(0,0,0,.1); padding: 1rem; }
.card .value { font-size: 1.75rem; font-weight: 700; }
.card .title, .meta { color: #6b7280; font-size: .875rem; }
.ticket { margin-top: 1rem; }
.badge { border-radius: 999px; padding: .125rem .625rem; font-size: .8rem; background: #e5e7eb; margin-right: .25rem; }
.message { margin: .5rem 0; padding: .5rem .75rem; border-radius: 6px; background: #f3f4f6; }
.message.staff { background: #dbeafe; }
.empty { color: #6b7280; text-align: center; padding: 3rem 0; }
"#;

pub async fn index(State(state): State<Arc<AppState>>) -> Result<Html<String>, ApiError> {
    let stats = state.db.ticket_stats().await?;
    let tickets = state.db.closed_tickets(None).await?;

    Ok(Html(render(&stats, &tickets)))
}

pub fn render(stats: &TicketStats, tickets: &[ArchivedTicket]) -> String {
    let mut cards = vec![stat_card("Total", stats.total)];
    cards.extend(
        TicketKind::ALL
            .iter()
            .map(|kind| stat_card(kind.label(), count(&stats.by_type, kind))),
    );
    cards.extend(
        TicketStatus::ALL
            .iter()
            .map(|status| stat_card(status.label(), count(&stats.by_status, status))),
    );

    let ticket_list = if tickets.is_empty() {
        r#"<p class="empty">No archived tickets yet.</p>"#.to_string()
    } else {
        tickets.iter().map(ticket_section).collect()
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Ticket Dashboard</title>
<style>{STYLE}</style>
</head>
<body>
<main>
<h1>Ticket Dashboard</h1>
<p class="meta">Last updated {updated}</p>
<section class="cards">{cards}</section>
<section>{ticket_list}</section>
</main>
</body>
</html>"#,
        updated = format_time(stats.last_updated),
        cards = cards.concat(),
    )
}

fn count<K: Ord>(counts: &BTreeMap<K, usize>, key: &K) -> usize {
    counts.get(key).copied().unwrap_or_default()
}

fn stat_card(title: &str, value: usize) -> String {
    format!(
        r#"<div class="card"><div class="title">{}</div><div class="value">{value}</div></div>"#,
        html_escape(title)
    )
}

fn ticket_section(ticket: &ArchivedTicket) -> String {
    let transcript: String = ticket.messages.iter().map(transcript_message).collect();

    format!(
        r#"<article class="ticket">
<h3>{title}</h3>
<p class="meta">ID: {id} &middot; Opened by {user} &middot; Closed by {staff} &middot; {created} to {closed}</p>
<p><span class="badge">{kind}</span><span class="badge">{status}</span></p>
<p><strong>Reason:</strong> {reason}</p>
<details><summary>Transcript ({message_count} messages)</summary>{transcript}</details>
</article>"#,
        title = html_escape(&ticket.title),
        id = html_escape(&ticket.id),
        user = html_escape(&ticket.user.username),
        staff = html_escape(&ticket.staff.username),
        created = format_time(ticket.created_at),
        closed = format_time(ticket.closed_at),
        kind = ticket.kind.label(),
        status = ticket.status.label(),
        reason = html_escape(&ticket.reason),
        message_count = ticket.messages.len(),
    )
}

fn transcript_message(message: &TranscriptMessage) -> String {
    let (class, badge) = if message.is_staff {
        ("message staff", r#" <span class="badge">Staff</span>"#)
    } else {
        ("message", "")
    };

    format!(
        r#"<div class="{class}"><div class="meta"><strong>{author}</strong>{badge} {time}</div><div>{content}</div></div>"#,
        author = html_escape(&message.author),
        time = format_time(message.timestamp),
        content = html_escape(&message.content).replace('\n', "<br>"),
    )
}

fn format_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M UTC").to_string()
}

pub fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
