//! Canned responders that need nothing but the message itself.

use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;

use crate::{
    dispatch::{Captures, Plugin, RuleSpec},
    domain::IncomingMessage,
    errors::Error,
    messaging::types::Reply,
    roster::Roster,
    Result,
};

const MAX_DICE: u32 = 100;
const MAX_SIDES: u32 = 1_000;

const WHELPS: [&str; 6] = [
    "WHELPS",
    "LEFT SIDE",
    "EVEN SIDE",
    "MANY WHELPS",
    "NOW",
    "HANDLE IT!",
];

pub struct SimplePlugin {
    roster: Arc<Roster>,
}

fn reply(text: impl Into<String>) -> Vec<Reply> {
    vec![Reply::Reply(text.into())]
}

/// `-ing` → `-ong`, keeping the case of the last letter and any decoration around it.
fn ping_pong(caps: &Captures) -> Option<String> {
    let word = caps.get("word")?;
    let pre = caps.get("pre").unwrap_or_default();
    let suf = caps.get("suf").unwrap_or_default();
    let plural = caps.get("s").unwrap_or_default();

    let lower = word.chars().last().map(char::is_lowercase).unwrap_or(true);
    let ong = if lower { "ong" } else { "ONG" };
    let s = match plural {
        "" => "",
        p if p.chars().all(char::is_lowercase) => "s",
        _ => "S",
    };
    Some(format!("Actually, it's \"{pre}{word}{ong}{s}{suf}\""))
}

/// A single `NdM` set.
fn parse_die(set: &str) -> Option<(u32, u32)> {
    let (n, m) = set.split_once(['d', 'D'])?;
    Some((n.parse().ok()?, m.parse().ok()?))
}

/// Roll each dice set, adding the sum of modifiers to every set.
fn roll_dice(dice: Option<&str>, mods: Option<&str>, rng: &mut impl Rng) -> Result<String> {
    let modifier = mods
        .unwrap_or_default()
        .split_whitespace()
        .filter_map(|m| m.parse::<i64>().ok())
        .try_fold(0i64, i64::checked_add)
        .ok_or(Error::Overflow)?;

    let sets: Vec<&str> = dice.unwrap_or_default().split_whitespace().collect();
    if sets.is_empty() {
        let total = rng.gen_range(1..=6);
        return Ok(format!("Got dice sets: 1d6: {total}\nTotal: {total}"));
    }

    let mut total = 0i64;
    let mut results = Vec::with_capacity(sets.len());
    for set in sets {
        let (number, size) = parse_die(set)
            .filter(|(n, s)| *n <= MAX_DICE && (1..=MAX_SIDES).contains(s))
            .ok_or_else(|| Error::PreconditionFailed(format!("I can't roll {set}!")))?;
        let rolled: i64 = (0..number).map(|_| rng.gen_range(1..=size) as i64).sum();
        let val = rolled.checked_add(modifier).ok_or(Error::Overflow)?;
        total = total.checked_add(val).ok_or(Error::Overflow)?;
        results.push(format!("{set}: {val}"));
    }
    Ok(format!(
        "Got dice sets: {}\nTotal: {total}",
        results.join(", ")
    ))
}

fn manatee(rng: &mut impl Rng) -> String {
    match rng.gen_range(1..=34) {
        34 => "https://cdn.meme.am/cache/instances/folder898/65169898.jpg".to_string(),
        n => format!("http://calmingmanatee.com/img/manatee{n}.jpg"),
    }
}

impl SimplePlugin {
    pub fn new(roster: Arc<Roster>) -> Self {
        Self { roster }
    }

    /// Shouting (all caps, longer than four characters) that isn't just someone's nick.
    async fn is_shouting(&self, msg: &IncomingMessage) -> bool {
        let text = msg.text.as_str();
        text == text.to_uppercase()
            && text.chars().count() > 4
            && !self
                .roster
                .contains(msg.chat_id(), &text.to_lowercase())
                .await
    }
}

#[async_trait]
impl Plugin for SimplePlugin {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn rules(&self) -> Vec<RuleSpec> {
        vec![
            RuleSpec::mention(
                "shenanigans",
                r"what's the name of that place you like with all the goofy shit on the walls\?",
            )
            .help("what's the name of that place you like with all the goofy shit on the walls?"),
            RuleSpec::mention("hi", r"^hi!?$").help("say hi. Example: hi!"),
            RuleSpec::mention(
                "roll",
                r"^roll\sdice(?P<dice>(\s+\d+d\d+)+)?(\swith\s.*\smodifiers?\s(?P<mods>(\s*[+-]\d+)+))?\s*$",
            )
            .help("roll some dice. Example: roll dice 1d4 2d6 with butts modifier +1"),
            RuleSpec::mention("spin", r"spin\sthe\swheel").help("spin the wheel"),
            RuleSpec::mention("portland", r"tell\s(?P<who>.+)\sto\scome\sto\sPortland")
                .requires(&["who"])
                .help("tell somebody to come to Portland. Example: tell @amy to come to Portland"),
            RuleSpec::mention("seattle", r"tell\s(?P<who>.+)\sto\scome\sto\sSeattle")
                .requires(&["who"])
                .help("tell somebody to come to Seattle"),
            RuleSpec::mention("cleveland", r"tell\s(?P<who>.+)\sto\scome\sto\sCleveland")
                .requires(&["who"])
                .help("tell somebody to come to Cleveland"),
            RuleSpec::listen("towel", r"you're a towel")
                .help("Example: hey, you're a towel, guy!"),
            RuleSpec::listen("bot_towel", r"you're a (bot|python|robot) towel")
                .help("Example: hey, you're a bot towel, buddy!"),
            RuleSpec::listen("martin", r"martin").help("Example: Yesterday Martin did a thing."),
            RuleSpec::listen(
                "ping",
                r"^(?P<pre>[^\w\s]*|_*)(?P<word>[a-zA-Z_-]+)ING(?P<s>S?)(?P<suf>[^\w\s]*|_*)(\sME(\s.*)?)?$",
            )
            .requires(&["word"])
            .help("say a word ending in 'ing'. Examples: fling, *ding*, ping me"),
            RuleSpec::listen("whelps", r"whelps").help("Example: I broke it. #whelps"),
            RuleSpec::listen("fixit", r"fixit").help("Example: You broked it. FIXIT"),
            RuleSpec::listen("fine", r"this\sis\sfine").help("Example: This is fine."),
            RuleSpec::listen("great_day", r"(it's\sgonna\sbe\sa\s)*great\sday")
                .help("Example: It's gonna be a great day."),
            RuleSpec::listen(
                "spend",
                r"can\s(.*)\sspend\s(this|that|the)\smoney",
            )
            .help("Example: Hey, can Brian spend that money?"),
            RuleSpec::listen("love", r"(^|\s)what\sis\slove\?*$").help("Example: Hey, what is love?"),
            RuleSpec::listen("manatee", r"[A-Z]{3}")
                .case_sensitive()
                .help("voice your anger"),
            RuleSpec::listen("enhance", r"enhance").help("Enhance!"),
        ]
    }

    async fn handle(
        &self,
        action: &str,
        msg: &IncomingMessage,
        caps: &Captures,
    ) -> Result<Vec<Reply>> {
        let who = caps.get("who").unwrap_or_default().trim_start_matches('@');

        let replies = match action {
            "shenanigans" => {
                reply("You mean Shenanigans? You guys talkin' 'bout shenanigans?")
            }
            "hi" => reply("Yo!"),
            "roll" => {
                let text = roll_dice(caps.get("dice"), caps.get("mods"), &mut rand::thread_rng())?;
                reply(text)
            }
            "spin" => {
                let n = rand::thread_rng().gen_range(1..=20) * 5;
                reply(n.to_string())
            }
            "portland" => vec![Reply::Say(format!(
                "@{who}: http://i.imgur.com/29hMr0h.jpg"
            ))],
            "seattle" => vec![Reply::Say(format!(
                "@{who}: http://i.imgur.com/Lwo0CTF.gif"
            ))],
            "cleveland" => vec![Reply::Say(format!(
                "@{who}: https://www.youtube.com/watch?v=ysmLA5TqbIY"
            ))],
            "towel" => reply("YOU'RE a towel!"),
            "bot_towel" => reply("What did you say?!"),
            "martin" => reply("s/Martin/1950's newscast guy/g"),
            "ping" => ping_pong(caps).map(reply).unwrap_or_default(),
            "whelps" => WHELPS.iter().map(|w| Reply::Reply(w.to_string())).collect(),
            "fixit" => reply("https://www.youtube.com/watch?v=8ZCysBT5Kec"),
            "fine" => reply("http://gunshowcomic.com/648"),
            "great_day" => reply("https://www.youtube.com/watch?v=WRu_-9MBpd4"),
            "spend" => reply("http://brianauron.info/CanBobiSpendThisMoney"),
            "love" => {
                reply("Baby don't hurt me!  https://www.youtube.com/watch?v=JRVfysTXhNA")
            }
            "manatee" => {
                if self.is_shouting(msg).await {
                    let url = manatee(&mut rand::thread_rng());
                    reply(url)
                } else {
                    Vec::new()
                }
            }
            "enhance" => vec![Reply::Say("*types furiously* \"Enhance.\"".to_string())],
            _ => Vec::new(),
        };
        Ok(replies)
    }
}
