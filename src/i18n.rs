//! Static UI translation map. One row per key, columns per locale; lookups
//! for a missing locale string fall back to english so the UI never renders
//! a bare key.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Hindi,
    Telugu,
}

impl Default for Language {
    fn default() -> Self {
        Self::English
    }
}

impl FromStr for Language {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "english" | "en" => Ok(Self::English),
            "hindi" | "hi" => Ok(Self::Hindi),
            "telugu" | "te" => Ok(Self::Telugu),
            _ => Err(()),
        }
    }
}

// (key, english, hindi, telugu). An empty string means "not translated yet"
// and resolves to the english column.
const ENTRIES: &[(&str, &str, &str, &str)] = &[
    ("nav.home", "Home", "होम", "హోమ్"),
    ("nav.about", "About Us", "हमारे बारे में", "మా గురించి"),
    ("nav.features", "Features", "विशेषताएं", "ఫీచర్లు"),
    ("nav.contact", "Contact Us", "संपर्क करें", "సంప్రదించండి"),
    ("nav.signin", "Sign In", "साइन इन करें", "సైన్ ఇన్"),
    (
        "home.title",
        "Healthcare Reimagined",
        "स्वास्थ्य सेवा का पुनर्कल्पना",
        "ఆరోగ్య సంరక్షణ పునఃకల్పన",
    ),
    (
        "home.subtitle",
        "Connecting Rural India to Urban Healthcare through AI-powered technologies.",
        "AI-संचालित तकनीकों के माध्यम से ग्रामीण भारत को शहरी स्वास्थ्य सेवा से जोड़ना।",
        "AI-ఆధారిత సాంకేతికతల ద్వారా గ్రామీణ భారతదేశాన్ని పట్టణ ఆరోగ్య సంరక్షణతో అనుసంధానించడం.",
    ),
    (
        "feature.scheduler.title",
        "Medicine Scheduler",
        "दवा शेड्यूलर",
        "మందుల షెడ్యూలర్",
    ),
    (
        "feature.scheduler.desc",
        "Never miss a dose with our smart medication scheduling system.",
        "हमारे स्मार्ट दवा शेड्यूलिंग सिस्टम के साथ कभी भी दवा न भूलें।",
        "మా స్మార్ట్ మెడికేషన్ షెడ్యూలింగ్ సిస్టమ్‌తో మందు మోతాదును మిస్ కాకుండా ఉండండి.",
    ),
    (
        "feature.chat.title",
        "Doc Chat",
        "डॉक्टर चैट",
        "డాక్ చాట్",
    ),
    (
        "docchat.welcome",
        "Welcome to Doc Chat",
        "डॉक्टर चैट में आपका स्वागत है",
        "డాక్ చాట్‌కి స్వాగతం",
    ),
    (
        "docchat.prompt",
        "Ask any health-related questions to get started.",
        "शुरू करने के लिए कोई भी स्वास्थ्य संबंधित प्रश्न पूछें।",
        "ప్రారంభించడానికి ఏవైనా ఆరోగ్య-సంబంధిత ప్రశ్నలను అడగండి.",
    ),
    ("docchat.thinking", "Thinking...", "सोच रहा हूँ...", "ఆలోచిస్తున్నాను..."),
    (
        "docchat.poweredby",
        "Powered by Google Gemini AI",
        "Google Gemini AI द्वारा संचालित",
        "Google Gemini AI ద్వారా ఆధారితం",
    ),
    (
        "auth.signin.title",
        "Welcome back",
        "वापसी पर स्वागत है",
        "తిరిగి స్వాగతం",
    ),
    (
        "auth.signup.title",
        "Create an account",
        "खाता बनाएं",
        "ఖాతాను సృష్టించండి",
    ),
    (
        "reminder.title",
        "Medicine Reminder",
        "दवा अनुस्मारक",
        "మందుల రిమైండర్",
    ),
    (
        "reminder.taken",
        "I took it",
        "मैंने ले ली",
        "నేను తీసుకున్నాను",
    ),
    (
        "reminder.missed",
        "Nah, I missed it",
        "नहीं, मैं भूल गया",
        "లేదు, నేను మిస్ అయ్యాను",
    ),
];

fn column(
    row: &'static (&'static str, &'static str, &'static str, &'static str),
    lang: Language,
) -> &'static str {
    let s = match lang {
        Language::English => row.1,
        Language::Hindi => row.2,
        Language::Telugu => row.3,
    };
    if s.is_empty() {
        row.1
    } else {
        s
    }
}

/// Look up one key for a locale. `None` only when the key itself is unknown.
pub fn translate(lang: Language, key: &str) -> Option<&'static str> {
    ENTRIES
        .iter()
        .find(|row| row.0 == key)
        .map(|row| column(row, lang))
}

/// Full dictionary for one locale, for bulk shipping to the client.
pub fn dictionary(lang: Language) -> serde_json::Map<String, serde_json::Value> {
    ENTRIES
        .iter()
        .map(|row| (row.0.to_string(), column(row, lang).into()))
        .collect()
}
