use async_trait::async_trait;
use tracing::info;

use crate::{
    dispatch::{Captures, Plugin, RuleSpec},
    domain::{normalize_nick, IncomingMessage},
    messaging::types::Reply,
    store::EndorsementStore,
    Result,
};

pub struct EndorsementsPlugin {
    store: EndorsementStore,
}

impl EndorsementsPlugin {
    pub fn new(store: EndorsementStore) -> Self {
        Self { store }
    }

    async fn endorse(&self, msg: &IncomingMessage, user: &str, skill: &str) -> Result<Reply> {
        info!("Got an endorsement request");
        let endorser = msg.sender.person_id();
        let endorsee = normalize_nick(user);
        let skill = skill.trim();

        self.store.endorse(&endorser, &endorsee, skill).await?;
        Ok(Reply::Reply(format!(
            "{endorser} has endorsed {endorsee} for \"{skill}\""
        )))
    }

    async fn list(&self, user: Option<&str>) -> Result<Reply> {
        let filter = user.map(normalize_nick);
        let summaries = self.store.list_endorsements(filter.as_deref()).await?;

        let mut text = String::from("```\n");
        for summary in summaries {
            text.push_str(&format!("Name: {}\n", summary.endorsee));
            for (skill, n) in summary.skills {
                text.push_str(&format!("Endorsements for {skill}: {n}\n"));
            }
        }
        text.push_str("```");
        Ok(Reply::Direct(text))
    }

    async fn vaccinated(&self) -> Result<Reply> {
        info!("Got request to list \"vaccinated\" endorsements");
        let people = self.store.list_vaccinated().await?;
        Ok(Reply::Reply(format!(
            "The following users have been endorsed for \"vaccinated\":\n```\n{}\n```",
            people.join("\n")
        )))
    }
}

#[async_trait]
impl Plugin for EndorsementsPlugin {
    fn name(&self) -> &'static str {
        "endorsements"
    }

    fn rules(&self) -> Vec<RuleSpec> {
        vec![
            RuleSpec::mention(
                "endorse",
                r"^endorse\s@(?P<user>\w+)(\sfor)?\s(?P<skill>.+)$",
            )
            .requires(&["user", "skill"])
            .help("endorse someone for something. Example: endorse @amy for rust"),
            RuleSpec::mention(
                "list",
                r"^list\sendorsements(\s(for\s)?@(?P<user>\w+))?",
            )
            .help("list endorsements, optionally for one person. Example: list endorsements for @amy"),
            RuleSpec::mention("vaccinated", r"^who\sis\svaccinated\??$")
                .help("list people endorsed for \"vaccinated\""),
        ]
    }

    async fn handle(
        &self,
        action: &str,
        msg: &IncomingMessage,
        caps: &Captures,
    ) -> Result<Vec<Reply>> {
        let reply = match action {
            "endorse" => {
                self.endorse(
                    msg,
                    caps.get("user").unwrap_or_default(),
                    caps.get("skill").unwrap_or_default(),
                )
                .await?
            }
            "list" => self.list(caps.get("user")).await?,
            "vaccinated" => self.vaccinated().await?,
            _ => return Ok(Vec::new()),
        };
        Ok(vec![reply])
    }
}
