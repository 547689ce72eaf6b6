use poise::serenity_prelude::InputTextStyle;
use ticket_bot_macros::define_modal;

define_modal! {
    CloseReason {
        custom_id: "close_submit",
        title: "Close Ticket",
        inputs: [
            reason {
                style: InputTextStyle::Paragraph,
                label: "Reason",
                min_length: 1,
                max_length: 500,
                required: true,
                placeholder: "How was this ticket resolved?",
            },
        ],
    }
}

define_modal! {
    AddMember {
        custom_id: "add_member_submit",
        title: "Add Member",
        inputs: [
            user_id {
                style: InputTextStyle::Short,
                label: "User ID or mention",
                min_length: 17,
                max_length: 24,
                placeholder: "123456789012345678",
            },
        ],
    }
}

define_modal! {
    RemoveMember {
        custom_id: "remove_member_submit",
        title: "Remove Member",
        inputs: [
            user_id {
                style: InputTextStyle::Short,
                label: "User ID or mention",
                min_length: 17,
                max_length: 24,
                placeholder: "123456789012345678",
            },
        ],
    }
}

define_modal! {
    RenameTicket {
        custom_id: "rename_submit",
        title: "Rename Ticket",
        inputs: [
            name {
                style: InputTextStyle::Short,
                label: "New channel name",
                min_length: 1,
                max_length: 100,
            },
        ],
    }
}
