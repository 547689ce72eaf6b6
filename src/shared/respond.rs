use std::future::Future;

use anyhow::{Context as _, Result, anyhow};
use either::Either;
use poise::serenity_prelude::{
    CacheHttp as _, ChannelId, ComponentInteraction, Context as SerenityContext, CreateActionRow,
    CreateEmbed, CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateInteractionResponseMessage, CreateMessage, CreateModal, ModalInteraction,
};
use tracing::debug;

/// Ways of getting a message in front of the user who triggered an interaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    InteractionResponse,
    Followup,
    ChannelMessage,
}

const UNACKNOWLEDGED: &[Strategy] = &[
    Strategy::InteractionResponse,
    Strategy::Followup,
    Strategy::ChannelMessage,
];
const ACKNOWLEDGED: &[Strategy] = &[Strategy::Followup, Strategy::ChannelMessage];

/// Tries each strategy in turn and stops at the first that succeeds. If all of them fail, the
/// last error is returned.
pub async fn deliver_in_order<F, Fut>(strategies: &[Strategy], mut attempt: F) -> Result<Strategy>
where
    F: FnMut(Strategy) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut last_error = None;

    for &strategy in strategies {
        match attempt(strategy).await {
            Ok(()) => return Ok(strategy),
            Err(err) => {
                debug!("Delivery via {strategy:?} failed: {err:#}");
                last_error = Some(err.context(format!("Delivery via {strategy:?} failed")));
            }
        }
    }

    Err(last_error.unwrap_or_else(|| anyhow!("No delivery strategy to try")))
}

#[derive(Clone, Debug, Default)]
pub struct Reply {
    content: Option<String>,
    embeds: Vec<CreateEmbed>,
    components: Vec<CreateActionRow>,
    ephemeral: bool,
}

impl Reply {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn embed(mut self, embed: CreateEmbed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn components(mut self, components: Vec<CreateActionRow>) -> Self {
        self.components = components;
        self
    }

    pub fn ephemeral(mut self, ephemeral: bool) -> Self {
        self.ephemeral = ephemeral;
        self
    }

    fn into_response(self) -> CreateInteractionResponse {
        let mut message = CreateInteractionResponseMessage::new()
            .embeds(self.embeds)
            .components(self.components)
            .ephemeral(self.ephemeral);
        if let Some(content) = self.content {
            message = message.content(content);
        }
        CreateInteractionResponse::Message(message)
    }

    fn into_followup(self) -> CreateInteractionResponseFollowup {
        let mut followup = CreateInteractionResponseFollowup::new()
            .embeds(self.embeds)
            .components(self.components)
            .ephemeral(self.ephemeral);
        if let Some(content) = self.content {
            followup = followup.content(content);
        }
        followup
    }

    fn into_message(self) -> CreateMessage {
        let mut message = CreateMessage::new()
            .embeds(self.embeds)
            .components(self.components);
        if let Some(content) = self.content {
            message = message.content(content);
        }
        message
    }
}

/// Delivers replies to a component or modal interaction, remembering whether the interaction
/// has already been acknowledged.
pub struct Responder<'a> {
    ctx: &'a SerenityContext,
    interaction: Either<&'a ComponentInteraction, &'a ModalInteraction>,
    acknowledged: bool,
}

impl<'a> Responder<'a> {
    pub fn new(
        ctx: &'a SerenityContext,
        interaction: Either<&'a ComponentInteraction, &'a ModalInteraction>,
    ) -> Self {
        Self {
            ctx,
            interaction,
            acknowledged: false,
        }
    }

    pub fn channel_id(&self) -> ChannelId {
        match self.interaction {
            Either::Left(interaction) => interaction.channel_id,
            Either::Right(interaction) => interaction.channel_id,
        }
    }

    /// Acknowledges the interaction with an ephemeral "thinking" state.
    pub async fn defer(&mut self) -> Result<()> {
        match self.interaction {
            Either::Left(interaction) => interaction.defer_ephemeral(self.ctx.http()).await,
            Either::Right(interaction) => interaction.defer_ephemeral(self.ctx.http()).await,
        }
        .context("Failed to defer interaction")?;

        self.acknowledged = true;
        Ok(())
    }

    pub async fn open_modal(&mut self, modal: CreateModal) -> Result<()> {
        let response = CreateInteractionResponse::Modal(modal);
        match self.interaction {
            Either::Left(interaction) => interaction.create_response(self.ctx.http(), response).await,
            Either::Right(_) => return Err(anyhow!("Cannot open a modal from a modal submission")),
        }
        .context("Failed to open modal")?;

        self.acknowledged = true;
        Ok(())
    }

    pub async fn send(&mut self, reply: Reply) -> Result<()> {
        let strategies = if self.acknowledged {
            ACKNOWLEDGED
        } else {
            UNACKNOWLEDGED
        };
        let (ctx, interaction, channel_id) = (self.ctx, self.interaction, self.channel_id());
        let reply = &reply;

        let delivered = deliver_in_order(strategies, |strategy| async move {
            let reply = reply.clone();
            match (strategy, interaction) {
                (Strategy::InteractionResponse, Either::Left(interaction)) => {
                    interaction
                        .create_response(ctx.http(), reply.into_response())
                        .await?
                }
                (Strategy::InteractionResponse, Either::Right(interaction)) => {
                    interaction
                        .create_response(ctx.http(), reply.into_response())
                        .await?
                }
                (Strategy::Followup, Either::Left(interaction)) => {
                    interaction
                        .create_followup(ctx.http(), reply.into_followup())
                        .await?;
                }
                (Strategy::Followup, Either::Right(interaction)) => {
                    interaction
                        .create_followup(ctx.http(), reply.into_followup())
                        .await?;
                }
                (Strategy::ChannelMessage, _) => {
                    channel_id
                        .send_message(ctx.http(), reply.into_message())
                        .await?;
                }
            }
            Ok::<_, anyhow::Error>(())
        })
        .await?;

        if delivered == Strategy::InteractionResponse {
            self.acknowledged = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[tokio::test]
    async fn stops_at_first_successful_strategy() {
        let attempts = Mutex::new(Vec::new());

        let delivered = deliver_in_order(UNACKNOWLEDGED, |strategy| {
            attempts.lock().unwrap().push(strategy);
            async move {
                match strategy {
                    Strategy::InteractionResponse => Err(anyhow!("already acknowledged")),
                    _ => Ok(()),
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(delivered, Strategy::Followup);
        assert_eq!(
            *attempts.lock().unwrap(),
            vec![Strategy::InteractionResponse, Strategy::Followup]
        );
    }

    #[tokio::test]
    async fn surfaces_last_error_when_every_strategy_fails() {
        let err = deliver_in_order(UNACKNOWLEDGED, |strategy| async move {
            Err::<(), _>(anyhow!("{strategy:?} rejected"))
        })
        .await
        .unwrap_err();

        let message = format!("{err:#}");
        assert!(message.contains("ChannelMessage rejected"), "{message}");
        assert!(!message.contains("Followup rejected"), "{message}");
    }

    #[tokio::test]
    async fn acknowledged_interactions_skip_the_initial_response() {
        let delivered = deliver_in_order(ACKNOWLEDGED, |strategy| async move {
            assert_ne!(strategy, Strategy::InteractionResponse);
            Ok::<_, anyhow::Error>(())
        })
        .await
        .unwrap();

        assert_eq!(delivered, Strategy::Followup);
    }

    #[tokio::test]
    async fn empty_strategy_list_is_an_error() {
        assert!(deliver_in_order(&[], |_| async { Ok::<_, anyhow::Error>(()) }).await.is_err());
    }
}
