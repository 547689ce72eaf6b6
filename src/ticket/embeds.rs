use poise::serenity_prelude::{
    ButtonStyle, CreateActionRow, CreateButton, CreateEmbed, CreateEmbedFooter, CreateSelectMenu,
    CreateSelectMenuKind, CreateSelectMenuOption, Mentionable as _, RoleId, Timestamp, User,
    colours::{
        branding::BLURPLE,
        css::{DANGER, POSITIVE, WARNING},
    },
};

use crate::ticket::interaction::PREFIX;
use crate::ticket::types::{ActiveTicket, ArchivedTicket, TicketKind};

pub fn panel_embed(image_url: Option<&str>) -> CreateEmbed {
    let kinds = TicketKind::ALL
        .iter()
        .map(|kind| format!("{} **{}**\n{}", kind.emoji(), kind.label(), kind.description()))
        .collect::<Vec<_>>()
        .join("\n\n");

    let embed = CreateEmbed::new()
        .title("Support Tickets")
        .description(format!(
            "Need help from the staff team? Pick a category below and a private channel will be \
            opened for you.\n\n{kinds}"
        ))
        .colour(BLURPLE)
        .footer(CreateEmbedFooter::new("One open ticket per member"));

    match image_url {
        Some(url) => embed.image(url),
        None => embed,
    }
}

pub fn panel_components() -> Vec<CreateActionRow> {
    let options = TicketKind::ALL
        .iter()
        .map(|kind| {
            CreateSelectMenuOption::new(kind.label(), kind.slug())
                .description(kind.description())
                .emoji(kind.emoji())
        })
        .collect();

    vec![CreateActionRow::SelectMenu(
        CreateSelectMenu::new(
            format!("{PREFIX}:select"),
            CreateSelectMenuKind::String { options },
        )
        .placeholder("Choose a ticket type")
        .min_values(1)
        .max_values(1),
    )]
}

pub fn welcome_content(ticket: &ActiveTicket, staff_role: RoleId) -> String {
    format!("{} {}", ticket.owner.id.mention(), staff_role.mention())
}

pub fn welcome_embed(ticket: &ActiveTicket) -> CreateEmbed {
    CreateEmbed::new()
        .title(format!("{} {}", ticket.kind.emoji(), ticket.kind.label()))
        .description(format!(
            "Welcome {}! Describe your request and a staff member will be with you shortly.\n\
            Use the buttons below to manage this ticket.",
            ticket.owner.id.mention()
        ))
        .field("Opened by", ticket.owner.username.clone(), true)
        .field("Type", ticket.kind.label(), true)
        .colour(BLURPLE)
        .timestamp(Timestamp::from(ticket.created_at))
}

pub fn welcome_components() -> Vec<CreateActionRow> {
    let button = |action: &str, label: &str, emoji: char, style: ButtonStyle| {
        CreateButton::new(format!("{PREFIX}:{action}"))
            .label(label)
            .emoji(emoji)
            .style(style)
    };

    vec![
        CreateActionRow::Buttons(vec![
            button("close", "Close", '🔒', ButtonStyle::Danger),
            button("claim", "Claim", '🙋', ButtonStyle::Success),
            button("add_member", "Add Member", '➕', ButtonStyle::Primary),
        ]),
        CreateActionRow::Buttons(vec![
            button("remove_member", "Remove Member", '➖', ButtonStyle::Secondary),
            button("rename", "Rename", '✏', ButtonStyle::Secondary),
            button("warn", "Warn Inactivity", '⚠', ButtonStyle::Secondary),
        ]),
    ]
}

pub fn claimed_embed(staff: &User) -> CreateEmbed {
    CreateEmbed::new()
        .description(format!("This ticket has been claimed by {}", staff.mention()))
        .colour(POSITIVE)
}

pub fn close_log_embed(ticket: &ArchivedTicket, dashboard_url: &str, delete_delay_secs: u64) -> CreateEmbed {
    CreateEmbed::new()
        .title("Ticket Closed")
        .description(format!(
            "This channel will be deleted in {delete_delay_secs} seconds.\n\
            The transcript is available on the [dashboard]({dashboard_url})."
        ))
        .field("Ticket", ticket.id.clone(), true)
        .field("Status", ticket.status.label(), true)
        .field("Messages", ticket.messages.len().to_string(), true)
        .field("Closed by", ticket.staff.id.mention().to_string(), true)
        .field("Reason", ticket.reason.clone(), false)
        .colour(DANGER)
        .timestamp(Timestamp::from(ticket.closed_at))
}

pub fn inactivity_warning_embed(staff: &User) -> CreateEmbed {
    CreateEmbed::new()
        .title("Inactivity Warning")
        .description(format!(
            "This ticket has been inactive for a while. Please reply, or {} may close it.",
            staff.mention()
        ))
        .colour(WARNING)
}

pub fn notice_embed(description: impl Into<String>) -> CreateEmbed {
    CreateEmbed::new().description(description).colour(POSITIVE)
}

pub fn dashboard_embed(dashboard_url: &str) -> CreateEmbed {
    CreateEmbed::new()
        .title("Ticket Dashboard")
        .description(format!(
            "Archived tickets and their transcripts are available at {dashboard_url}"
        ))
        .colour(BLURPLE)
}

pub fn dashboard_components(dashboard_url: &str) -> Vec<CreateActionRow> {
    vec![CreateActionRow::Buttons(vec![
        CreateButton::new_link(dashboard_url).label("Open Dashboard"),
    ])]
}
