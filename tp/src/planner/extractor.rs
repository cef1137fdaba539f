//! ConstraintExtractor - structured constraints from free text
//!
//! Layered extraction: a language-model assist proposes a JSON-shaped record,
//! and deterministic pattern rules back every field. The model's value wins
//! only when present and well-typed; the rules are the fallback of record.
//! Extraction never fails - a query the rules cannot read still produces a
//! fully-populated constraint record built from defaults.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use regex::{Regex, RegexBuilder};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::{Flexibility, ParsedConstraints, Session};
use crate::llm::{CompletionRequest, LlmClient, Message};

use super::stage::PlannerStage;

/// Max tokens requested from the model for an extraction assist
const EXTRACT_MAX_TOKENS: u32 = 1024;

/// Keyword -> tag tables for the rule families
const TRAVELER_TYPE_PATTERNS: &[(&str, &str)] = &[
    (r"\bsolo\b|\balone\b|\bmyself\b", "solo"),
    (r"\bcouple\b|\bpartner\b|\bboyfriend\b|\bgirlfriend\b|\bspouse\b", "couple"),
    (r"\bfamily\b|\bkids\b|\bchildren\b", "family"),
    (r"\bfriends\b|\bbuddies\b|\bgroup\b", "friends"),
];

const STYLE_PATTERNS: &[(&str, &str)] = &[
    (r"\badventure\b|\bhiking\b|\bextreme\b|\boutdoor\b", "adventure"),
    (r"\brelax\b|\bchill\b|\bpeaceful\b|\bquiet\b", "relaxation"),
    (r"\bculture\b|\bhistory\b|\bmuseum\b|\bart\b", "culture"),
    (r"\bfood\b|\bculinary\b|\brestaurant\b|\beating\b", "food"),
    (r"\bnightlife\b|\bparty\b|\bbar\b|\bclub\b", "nightlife"),
    (r"\bbeach\b|\bsun\b|\bocean\b|\bcoast\b", "beach"),
    (r"\bnature\b|\bpark\b|\bforest\b|\bmountain\b", "nature"),
    (r"\bbudget\b|\bcheap\b|\baffordable\b", "budget"),
    (r"\bluxury\b|\bupscale\b|\bfancy\b", "luxury"),
];

const ACCOMMODATION_PATTERNS: &[(&str, &str)] = &[
    (r"\bhotel\b|\bresort\b", "hotel"),
    (r"\bhostel\b|\bdorm\b", "hostel"),
    (r"\bairbnb\b|\bapartment\b|\brental\b", "airbnb"),
    (r"\bcamping\b|\bcamp\b|\btent\b", "camping"),
    (r"\bb&b\b|\bbed\s+and\s+breakfast\b", "bnb"),
];

const TRANSPORT_PATTERNS: &[(&str, &str)] = &[
    (r"\bflight\b|\bfly\b|\bplane\b|\bair\b", "flight"),
    (r"\bcar\b|\bdrive\b|\bdriving\b|\broad\s+trip\b", "car"),
    (r"\btrain\b|\brail\b", "train"),
    (r"\bbus\b", "bus"),
    (r"\bwalk\b|\bwalking\b", "walking"),
    (r"\bbike\b|\bcycling\b", "bike"),
];

const ACTIVITY_PATTERNS: &[(&str, &str)] = &[
    (r"\bhiking\b|\bhike\b|\btrail\b", "hiking"),
    (r"\bmuseum\b|\bgallery\b", "museums"),
    (r"\bshopping\b|\bmarket\b", "shopping"),
    (r"\bfood\b|\beating\b|\brestaurant\b", "dining"),
    (r"\bnightlife\b|\bbar\b|\bclub\b", "nightlife"),
    (r"\bsightseeing\b|\btourist\b", "sightseeing"),
    (r"\bbeach\b|\bswimming\b", "beach"),
    (r"\bphotography\b|\bphoto\b", "photography"),
];

const DIETARY_PATTERNS: &[(&str, &str)] = &[
    (r"\bvegetarian\b|\bveggie\b", "vegetarian"),
    (r"\bvegan\b", "vegan"),
    (r"\bgluten.free\b|\bceliac\b", "gluten-free"),
    (r"\bhalal\b", "halal"),
    (r"\bkosher\b", "kosher"),
    (r"\ballergy\b|\ballergic\b", "allergies"),
];

const ACCESSIBILITY_PATTERNS: &[(&str, &str)] = &[
    (r"\bwheelchair\b|\bmobility\b", "wheelchair-accessible"),
    (r"\bvisual\b|\bblind\b", "visual-impairment"),
    (r"\bhearing\b|\bdeaf\b", "hearing-impairment"),
    (r"\baccessible\b|\bdisability\b", "general-accessibility"),
];

const CURRENCY_PATTERNS: &[(&str, &str)] = &[
    (r"\$", "USD"),
    (r"€", "EUR"),
    (r"£", "GBP"),
    (r"\bUSD\b", "USD"),
    (r"\bEUR\b", "EUR"),
    (r"\bGBP\b", "GBP"),
];

/// Extracts structured constraints from natural-language travel queries
pub struct ConstraintExtractor {
    /// Optional model assist; rules carry the load when absent
    llm: Option<Arc<dyn LlmClient>>,
    date_patterns: Vec<Regex>,
    budget_patterns: Vec<Regex>,
    destination_patterns: Vec<Regex>,
    origin_patterns: Vec<Regex>,
    must_have_patterns: Vec<Regex>,
    must_avoid_patterns: Vec<Regex>,
}

impl ConstraintExtractor {
    /// Create an extractor, optionally wired to a language model
    pub fn new(llm: Option<Arc<dyn LlmClient>>) -> Self {
        debug!(has_llm = llm.is_some(), "ConstraintExtractor::new: called");
        Self {
            llm,
            date_patterns: compile(&[
                r"\b(\d{1,2}[/-]\d{1,2}[/-]\d{2,4})\b",
                r"\b(\d{4}[/-]\d{1,2}[/-]\d{1,2})\b",
                r"\b((?:January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2}(?:,\s*\d{4})?)\b",
                r"\b((?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+\d{1,2}(?:,\s*\d{4})?)\b",
            ]),
            budget_patterns: compile(&[
                r"\$(\d+(?:,\d{3})*(?:\.\d{2})?)",
                r"(\d+(?:,\d{3})*(?:\.\d{2})?)\s*dollars?",
                r"budget.*?(\d+(?:,\d{3})*)",
                r"under.*?\$?(\d+(?:,\d{3})*)",
            ]),
            destination_patterns: compile(&[
                r"\bto\s+([A-Za-z\s]+?)(?:\s+for|\s+in|\s*[,.]|$)",
                r"\bvisit\s+([A-Za-z\s]+?)(?:\s+for|\s+in|\s*[,.]|$)",
                r"\btrip\s+to\s+([A-Za-z\s]+?)(?:\s+for|\s+in|\s*[,.]|$)",
            ]),
            origin_patterns: compile(&[
                r"\bfrom\s+([A-Za-z\s]+?)(?:\s+to|\s+in|\s*[,.])",
                r"\bbased\s+in\s+([A-Za-z\s]+?)(?:\s+and|\s*[,.])",
                r"\bdeparting\s+from\s+([A-Za-z\s]+?)(?:\s+to|\s*[,.])",
            ]),
            must_have_patterns: compile(&[
                r"must\s+have\s+([^.,]+)",
                r"need\s+to\s+([^.,]+)",
                r"require\s+([^.,]+)",
                r"essential\s+([^.,]+)",
            ]),
            must_avoid_patterns: compile(&[
                r"avoid\s+([^.,]+)",
                r"don't\s+want\s+([^.,]+)",
                r"\bno\s+([^.,]+)",
            ]),
        }
    }

    /// Extract a fully-populated constraint record from a query
    ///
    /// Never fails: any field the model and the rules both miss gets that
    /// field's default.
    pub async fn extract(&self, query: &str) -> ParsedConstraints {
        debug!(query_len = query.len(), "extract: called");

        let ai = self.parse_with_model(query).await;

        let start_date = self.extract_start_date(query, &ai);
        let duration_days = self.extract_duration(query, &ai);
        let end_date = self.extract_end_date(query, &ai, start_date, duration_days);
        let duration_days = duration_days.or_else(|| derive_duration(start_date, end_date));

        let constraints = ParsedConstraints {
            origin: self.extract_origin(query, &ai),
            destinations: self.extract_destinations(query, &ai),
            start_date,
            end_date,
            duration_days,
            total_budget: self.extract_budget(query, &ai),
            budget_currency: self.extract_currency(query, &ai),
            traveler_count: self.extract_traveler_count(query, &ai),
            traveler_types: extract_tags(query, TRAVELER_TYPE_PATTERNS, &ai, "/travelers/type", Some("solo")),
            travel_style: extract_tags(query, STYLE_PATTERNS, &ai, "/preferences/style", Some("general")),
            accommodation_type: extract_tags(query, ACCOMMODATION_PATTERNS, &ai, "/preferences/accommodation", Some("hotel")),
            transportation_modes: extract_tags(query, TRANSPORT_PATTERNS, &ai, "/preferences/transportation", Some("flight")),
            activity_preferences: extract_tags(query, ACTIVITY_PATTERNS, &ai, "/preferences/activities", Some("sightseeing")),
            dietary_restrictions: extract_tags(query, DIETARY_PATTERNS, &ai, "/requirements/dietary", None),
            accessibility_needs: extract_tags(query, ACCESSIBILITY_PATTERNS, &ai, "/requirements/accessibility", None),
            must_have: self.extract_phrases(query, &self.must_have_patterns, &ai, "/requirements/must_have"),
            must_avoid: self.extract_phrases(query, &self.must_avoid_patterns, &ai, "/requirements/must_avoid"),
            flexibility: extract_flexibility(query),
        };

        debug!(
            destinations = constraints.destinations.len(),
            budget = ?constraints.total_budget,
            duration = ?constraints.duration_days,
            "extract: complete"
        );
        constraints
    }

    /// Ask the model for a best-effort structured parse
    ///
    /// Malformed or missing output degrades to `Value::Null`; every field
    /// accessor type-checks before trusting a model value.
    async fn parse_with_model(&self, query: &str) -> serde_json::Value {
        let Some(llm) = &self.llm else {
            debug!("parse_with_model: no model configured, rules only");
            return serde_json::Value::Null;
        };

        let prompt = format!(
            "Parse the following travel query and extract key information in JSON format:\n\n\
             Query: \"{}\"\n\n\
             Return JSON with these fields:\n\
             {{\n\
               \"origin\": \"departure city\",\n\
               \"destinations\": [\"destination1\"],\n\
               \"dates\": {{\"start\": \"YYYY-MM-DD\", \"end\": \"YYYY-MM-DD\", \"duration\": \"days\"}},\n\
               \"budget\": {{\"amount\": 0, \"currency\": \"USD\"}},\n\
               \"travelers\": {{\"count\": 1, \"type\": \"solo\"}},\n\
               \"preferences\": {{\"style\": [], \"accommodation\": [], \"transportation\": [], \"activities\": []}},\n\
               \"requirements\": {{\"must_have\": [], \"must_avoid\": [], \"accessibility\": [], \"dietary\": []}}\n\
             }}\n\n\
             Only return valid JSON, no other text.",
            query
        );

        let request = CompletionRequest {
            system_prompt: "You extract structured travel constraints from user queries.".to_string(),
            messages: vec![Message::user(prompt)],
            max_tokens: EXTRACT_MAX_TOKENS,
        };

        match llm.complete(request).await {
            Ok(response) => {
                let Some(text) = response.content else {
                    warn!("parse_with_model: empty model response, falling back to rules");
                    return serde_json::Value::Null;
                };
                match serde_json::from_str(strip_code_fences(&text)) {
                    Ok(value) => {
                        debug!("parse_with_model: model returned valid JSON");
                        value
                    }
                    Err(e) => {
                        warn!(error = %e, "parse_with_model: model output not JSON, falling back to rules");
                        serde_json::Value::Null
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "parse_with_model: model call failed, falling back to rules");
                serde_json::Value::Null
            }
        }
    }

    fn extract_origin(&self, query: &str, ai: &serde_json::Value) -> Option<String> {
        if let Some(origin) = ai.get("origin").and_then(|v| v.as_str())
            && !origin.is_empty()
        {
            debug!(%origin, "extract_origin: model value");
            return Some(origin.to_string());
        }

        for pattern in &self.origin_patterns {
            if let Some(cap) = pattern.captures(query) {
                let origin = cap[1].trim().to_string();
                debug!(%origin, "extract_origin: rule match");
                return Some(origin);
            }
        }

        None
    }

    fn extract_destinations(&self, query: &str, ai: &serde_json::Value) -> Vec<String> {
        if let Some(list) = ai.get("destinations").and_then(|v| v.as_array()) {
            let destinations: Vec<String> = list
                .iter()
                .filter_map(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if !destinations.is_empty() {
                debug!(count = destinations.len(), "extract_destinations: model values");
                return destinations;
            }
        }

        let mut destinations: Vec<String> = Vec::new();
        for pattern in &self.destination_patterns {
            for cap in pattern.captures_iter(query) {
                let dest = title_case(cap[1].trim());
                if !dest.is_empty() && !destinations.contains(&dest) {
                    destinations.push(dest);
                }
            }
        }

        if destinations.is_empty() {
            debug!("extract_destinations: nothing parseable, using sentinel");
            vec!["Unknown".to_string()]
        } else {
            debug!(count = destinations.len(), "extract_destinations: rule matches");
            destinations
        }
    }

    fn extract_start_date(&self, query: &str, ai: &serde_json::Value) -> Option<DateTime<Utc>> {
        if let Some(s) = ai.pointer("/dates/start").and_then(|v| v.as_str())
            && let Some(date) = parse_absolute_date(s)
        {
            debug!(%s, "extract_start_date: model value");
            return Some(date);
        }

        // Explicit absolute dates beat relative phrases
        for pattern in &self.date_patterns {
            if let Some(cap) = pattern.captures(query)
                && let Some(date) = parse_absolute_date(&cap[1])
            {
                debug!(matched = &cap[1], "extract_start_date: absolute rule match");
                return Some(date);
            }
        }

        if let Some(days) = relative_offset_days(query) {
            debug!(days, "extract_start_date: relative phrase");
            return Some(Utc::now() + Duration::days(days));
        }

        // Default: start tomorrow if no date specified
        debug!("extract_start_date: defaulting to tomorrow");
        Some(Utc::now() + Duration::days(1))
    }

    fn extract_end_date(
        &self,
        _query: &str,
        ai: &serde_json::Value,
        start_date: Option<DateTime<Utc>>,
        duration_days: Option<u32>,
    ) -> Option<DateTime<Utc>> {
        if let Some(s) = ai.pointer("/dates/end").and_then(|v| v.as_str())
            && let Some(date) = parse_absolute_date(s)
        {
            debug!(%s, "extract_end_date: model value");
            return Some(date);
        }

        // Start plus duration when both resolved; duration alone anchors off
        // the tomorrow default
        match (start_date, duration_days) {
            (Some(start), Some(duration)) => {
                debug!(duration, "extract_end_date: derived from start + duration");
                Some(start + Duration::days(duration as i64))
            }
            (None, Some(duration)) => {
                debug!(duration, "extract_end_date: anchored off tomorrow");
                Some(Utc::now() + Duration::days(1 + duration as i64))
            }
            _ => None,
        }
    }

    fn extract_duration(&self, query: &str, ai: &serde_json::Value) -> Option<u32> {
        if let Some(d) = ai.pointer("/dates/duration") {
            let parsed = d.as_u64().or_else(|| d.as_str().and_then(|s| s.trim().parse().ok()));
            if let Some(days) = parsed
                && days > 0
            {
                debug!(days, "extract_duration: model value");
                return Some(days as u32);
            }
        }

        let explicit = Regex::new(r"(?i)(\d+)[-\s]*(?:days?|nights?)").expect("hard-coded pattern is valid");
        if let Some(cap) = explicit.captures(query)
            && let Ok(days) = cap[1].parse::<u32>()
        {
            debug!(days, "extract_duration: explicit count");
            return Some(days);
        }

        let lowered = query.to_lowercase();
        if lowered.contains("weekend") {
            debug!("extract_duration: weekend keyword");
            return Some(3);
        }
        if Regex::new(r"\bweek\b").expect("hard-coded pattern is valid").is_match(&lowered) {
            debug!("extract_duration: week keyword");
            return Some(7);
        }

        None
    }

    fn extract_budget(&self, query: &str, ai: &serde_json::Value) -> Option<f64> {
        if let Some(amount) = ai.pointer("/budget/amount").and_then(|v| v.as_f64())
            && amount > 0.0
        {
            debug!(amount, "extract_budget: model value");
            return Some(amount);
        }

        for pattern in &self.budget_patterns {
            if let Some(cap) = pattern.captures(query) {
                let amount_str = cap[1].replace(',', "");
                if let Ok(amount) = amount_str.parse::<f64>() {
                    debug!(amount, "extract_budget: rule match");
                    return Some(amount);
                }
            }
        }

        None
    }

    fn extract_currency(&self, query: &str, ai: &serde_json::Value) -> String {
        if let Some(currency) = ai.pointer("/budget/currency").and_then(|v| v.as_str())
            && !currency.is_empty()
        {
            debug!(%currency, "extract_currency: model value");
            return currency.to_string();
        }

        for (pattern, currency) in CURRENCY_PATTERNS {
            let re = RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .expect("hard-coded pattern is valid");
            if re.is_match(query) {
                debug!(%currency, "extract_currency: rule match");
                return currency.to_string();
            }
        }

        "USD".to_string()
    }

    fn extract_traveler_count(&self, query: &str, ai: &serde_json::Value) -> u32 {
        if let Some(count) = ai.pointer("/travelers/count").and_then(|v| v.as_u64())
            && count >= 1
        {
            debug!(count, "extract_traveler_count: model value");
            return count as u32;
        }

        let explicit = Regex::new(r"(?i)(\d+)\s+(?:people|travelers?|adults?)|group\s+of\s+(\d+)|(\d+)\s+of\s+us")
            .expect("hard-coded pattern is valid");
        if let Some(cap) = explicit.captures(query) {
            let digits = cap.get(1).or_else(|| cap.get(2)).or_else(|| cap.get(3));
            if let Some(m) = digits
                && let Ok(count) = m.as_str().parse::<u32>()
                && count >= 1
            {
                debug!(count, "extract_traveler_count: explicit number");
                return count;
            }
        }

        // Pronoun heuristic: plural first, then singular, then solo default
        let plural = Regex::new(r"(?i)\bwe\b|\bus\b|\bour\b").expect("hard-coded pattern is valid");
        if plural.is_match(query) {
            debug!("extract_traveler_count: plural pronoun");
            return 2;
        }
        let singular = Regex::new(r"(?i)\bi\b|\bme\b|\bmy\b|\bsolo\b").expect("hard-coded pattern is valid");
        if singular.is_match(query) {
            debug!("extract_traveler_count: singular pronoun");
            return 1;
        }

        1
    }

    fn extract_phrases(&self, query: &str, patterns: &[Regex], ai: &serde_json::Value, pointer: &str) -> Vec<String> {
        if let Some(list) = ai.pointer(pointer).and_then(|v| v.as_array()) {
            let phrases: Vec<String> = list
                .iter()
                .filter_map(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if !phrases.is_empty() {
                debug!(pointer, count = phrases.len(), "extract_phrases: model values");
                return phrases;
            }
        }

        let mut phrases = Vec::new();
        for pattern in patterns {
            for cap in pattern.captures_iter(query) {
                let phrase = cap[1].trim().to_string();
                if !phrase.is_empty() && !phrases.contains(&phrase) {
                    phrases.push(phrase);
                }
            }
        }
        phrases
    }
}

#[async_trait]
impl PlannerStage for ConstraintExtractor {
    fn name(&self) -> &'static str {
        "parse"
    }

    async fn process(&self, mut session: Session) -> eyre::Result<Session> {
        debug!(session_id = %session.session_id, "ConstraintExtractor::process: called");
        session.log_step(self.name(), "Starting query parsing");

        let constraints = self.extract(&session.user_query).await;

        session.log_step(
            self.name(),
            format!(
                "Parsed query: {} destination(s), budget: {:?}, duration: {:?} days",
                constraints.destinations.len(),
                constraints.total_budget,
                constraints.duration_days
            ),
        );
        session.parsed_constraints = Some(constraints);
        session.touch();

        Ok(session)
    }
}

/// Compile a static pattern family case-insensitively
fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .expect("hard-coded pattern is valid")
        })
        .collect()
}

/// Rule-family tag extraction with model override and optional default
fn extract_tags(
    query: &str,
    table: &[(&str, &str)],
    ai: &serde_json::Value,
    pointer: &str,
    default: Option<&str>,
) -> Vec<String> {
    // Model value may be a list or a single string
    if let Some(value) = ai.pointer(pointer) {
        let from_model: Vec<String> = match value {
            serde_json::Value::Array(list) => list
                .iter()
                .filter_map(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            serde_json::Value::String(s) if !s.is_empty() => vec![s.clone()],
            _ => vec![],
        };
        if !from_model.is_empty() {
            debug!(pointer, count = from_model.len(), "extract_tags: model values");
            return from_model;
        }
    }

    let mut tags = Vec::new();
    for (pattern, tag) in table {
        let re = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .expect("hard-coded pattern is valid");
        if re.is_match(query) && !tags.contains(&tag.to_string()) {
            tags.push(tag.to_string());
        }
    }

    if tags.is_empty()
        && let Some(d) = default
    {
        tags.push(d.to_string());
    }
    tags
}

/// Days offset for relative date phrases, if any
fn relative_offset_days(query: &str) -> Option<i64> {
    let lowered = query.to_lowercase();

    let in_n_days = Regex::new(r"in\s+(\d+)\s+days?").expect("hard-coded pattern is valid");
    if let Some(cap) = in_n_days.captures(&lowered)
        && let Ok(days) = cap[1].parse::<i64>()
    {
        return Some(days);
    }

    if lowered.contains("next week") || lowered.contains("in a week") {
        return Some(7);
    }
    if lowered.contains("next month") || lowered.contains("in a month") {
        return Some(30);
    }

    None
}

/// Parse an absolute date string in any of the supported formats
fn parse_absolute_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    let numeric_formats = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%m-%d-%Y", "%m/%d/%y", "%m-%d-%y"];
    for format in numeric_formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return to_utc(date);
        }
    }

    let month_formats = ["%B %d, %Y", "%b %d, %Y"];
    for format in month_formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return to_utc(date);
        }
    }

    // Month-day without a year: assume the current year
    let with_year = format!("{}, {}", s, Utc::now().year());
    for format in month_formats {
        if let Ok(date) = NaiveDate::parse_from_str(&with_year, format) {
            return to_utc(date);
        }
    }

    None
}

fn to_utc(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt))
}

/// Duration in days between two resolved dates
fn derive_duration(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Option<u32> {
    match (start, end) {
        (Some(start), Some(end)) if end > start => Some((end - start).num_days() as u32),
        _ => None,
    }
}

/// Simple flexibility keyword scan
fn extract_flexibility(query: &str) -> BTreeMap<String, Flexibility> {
    let mut flexibility = BTreeMap::new();
    flexibility.insert("dates".to_string(), Flexibility::Medium);
    flexibility.insert("budget".to_string(), Flexibility::Medium);
    flexibility.insert("destinations".to_string(), Flexibility::Medium);

    let lowered = query.to_lowercase();
    if lowered.contains("flexible") || lowered.contains("open") {
        flexibility.insert("dates".to_string(), Flexibility::High);
        flexibility.insert("destinations".to_string(), Flexibility::High);
    }
    if lowered.contains("exact") || lowered.contains("specific") || lowered.contains("must") {
        flexibility.insert("dates".to_string(), Flexibility::Low);
        flexibility.insert("budget".to_string(), Flexibility::Low);
    }

    flexibility
}

/// Capitalize each word, normalizing rule-matched city names
fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strip markdown code fences models wrap JSON in
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::MockLlmClient;

    fn extractor() -> ConstraintExtractor {
        ConstraintExtractor::new(None)
    }

    #[tokio::test]
    async fn test_paris_reference_query() {
        let c = extractor()
            .extract("Plan a 3-day trip to Paris for 2 people with a budget of $2000")
            .await;

        assert_eq!(c.destinations, vec!["Paris"]);
        assert_eq!(c.duration_days, Some(3));
        assert_eq!(c.traveler_count, 2);
        assert_eq!(c.total_budget, Some(2000.0));
        assert_eq!(c.budget_currency, "USD");
        assert!(c.start_date.is_some());
        assert!(c.end_date.is_some());
    }

    #[tokio::test]
    async fn test_no_destination_yields_sentinel() {
        let c = extractor().extract("I want a relaxing vacation somewhere warm").await;

        assert_eq!(c.destinations, vec!["Unknown"]);
        assert!(!c.destinations.is_empty());
    }

    #[tokio::test]
    async fn test_empty_query_fills_every_default() {
        let c = extractor().extract("").await;

        assert_eq!(c.destinations, vec!["Unknown"]);
        assert_eq!(c.traveler_count, 1);
        assert_eq!(c.travel_style, vec!["general"]);
        assert_eq!(c.accommodation_type, vec!["hotel"]);
        assert_eq!(c.transportation_modes, vec!["flight"]);
        assert_eq!(c.activity_preferences, vec!["sightseeing"]);
        assert_eq!(c.budget_currency, "USD");
        // Default start: tomorrow
        assert!(c.start_date.is_some());
    }

    #[tokio::test]
    async fn test_relative_dates() {
        let next_week = extractor().extract("Visit Tokyo next week").await;
        let start = next_week.start_date.unwrap();
        let offset = (start - Utc::now()).num_days();
        assert!((6..=7).contains(&offset), "next week should start ~7 days out, got {offset}");

        let in_days = extractor().extract("Trip to Rome in 12 days").await;
        let offset = (in_days.start_date.unwrap() - Utc::now()).num_days();
        assert!((11..=12).contains(&offset), "in 12 days should start ~12 days out, got {offset}");
    }

    #[tokio::test]
    async fn test_absolute_date_beats_relative() {
        let c = extractor().extract("Trip to Rome on 2027-05-10, or maybe next week").await;
        let start = c.start_date.unwrap();
        assert_eq!(start.date_naive().to_string(), "2027-05-10");
    }

    #[tokio::test]
    async fn test_duration_keywords() {
        let weekend = extractor().extract("Weekend getaway to Boston").await;
        assert_eq!(weekend.duration_days, Some(3));

        let week = extractor().extract("A week in Lisbon please").await;
        assert_eq!(week.duration_days, Some(7));

        let nights = extractor().extract("5 nights in Madrid").await;
        assert_eq!(nights.duration_days, Some(5));
    }

    #[tokio::test]
    async fn test_end_date_is_start_plus_duration() {
        let c = extractor().extract("4 day trip to Oslo starting 2027-06-01").await;

        let start = c.start_date.unwrap();
        let end = c.end_date.unwrap();
        assert_eq!((end - start).num_days(), 4);
    }

    #[tokio::test]
    async fn test_traveler_pronoun_heuristics() {
        let couple = extractor().extract("We want to see Rome").await;
        assert_eq!(couple.traveler_count, 2);

        let solo = extractor().extract("Solo trip, just me").await;
        assert_eq!(solo.traveler_count, 1);

        let explicit = extractor().extract("Trip for 6 people to Denver").await;
        assert_eq!(explicit.traveler_count, 6);
    }

    #[tokio::test]
    async fn test_keyword_families() {
        let c = extractor()
            .extract("Budget hostel trip to Berlin, we love hiking and museums, vegetarian food, wheelchair access needed")
            .await;

        assert!(c.travel_style.contains(&"budget".to_string()));
        assert!(c.accommodation_type.contains(&"hostel".to_string()));
        assert!(c.activity_preferences.contains(&"hiking".to_string()));
        assert!(c.activity_preferences.contains(&"museums".to_string()));
        assert!(c.dietary_restrictions.contains(&"vegetarian".to_string()));
        assert!(c.accessibility_needs.contains(&"wheelchair-accessible".to_string()));
    }

    #[tokio::test]
    async fn test_origin_extraction() {
        let c = extractor().extract("Flying from Chicago to Miami, 3 days").await;
        assert_eq!(c.origin.as_deref(), Some("Chicago"));
    }

    #[tokio::test]
    async fn test_currency_detection() {
        let eur = extractor().extract("Trip to Vienna with 1500 EUR").await;
        assert_eq!(eur.budget_currency, "EUR");
    }

    #[tokio::test]
    async fn test_flexibility_keywords() {
        let flexible = extractor().extract("Totally flexible on dates, trip to Peru").await;
        assert_eq!(flexible.flexibility["dates"], Flexibility::High);

        let strict = extractor().extract("Must be exact dates, trip to Peru").await;
        assert_eq!(strict.flexibility["dates"], Flexibility::Low);
    }

    #[tokio::test]
    async fn test_model_values_win_when_well_typed() {
        let llm = Arc::new(MockLlmClient::with_text(
            r#"{"origin": "Seattle", "destinations": ["Kyoto", "Osaka"], "budget": {"amount": 3500, "currency": "USD"}, "travelers": {"count": 4}}"#,
        ));
        let extractor = ConstraintExtractor::new(Some(llm));

        let c = extractor.extract("A trip somewhere nice").await;

        assert_eq!(c.origin.as_deref(), Some("Seattle"));
        assert_eq!(c.destinations, vec!["Kyoto", "Osaka"]);
        assert_eq!(c.total_budget, Some(3500.0));
        assert_eq!(c.traveler_count, 4);
    }

    #[tokio::test]
    async fn test_fenced_model_json_is_unwrapped() {
        let llm = Arc::new(MockLlmClient::with_text(
            "```json\n{\"destinations\": [\"Lima\"]}\n```",
        ));
        let extractor = ConstraintExtractor::new(Some(llm));

        let c = extractor.extract("somewhere").await;
        assert_eq!(c.destinations, vec!["Lima"]);
    }

    #[tokio::test]
    async fn test_malformed_model_output_falls_back_to_rules() {
        let llm = Arc::new(MockLlmClient::with_text("Sorry, I can't help with that."));
        let extractor = ConstraintExtractor::new(Some(llm));

        let c = extractor.extract("Trip to Paris for 2 people, $800").await;

        assert_eq!(c.destinations, vec!["Paris"]);
        assert_eq!(c.traveler_count, 2);
        assert_eq!(c.total_budget, Some(800.0));
    }

    #[tokio::test]
    async fn test_model_error_falls_back_to_rules() {
        // Exhausted mock errors on the first call
        let llm = Arc::new(MockLlmClient::new(vec![]));
        let extractor = ConstraintExtractor::new(Some(llm));

        let c = extractor.extract("Trip to Paris").await;
        assert_eq!(c.destinations, vec!["Paris"]);
    }

    #[tokio::test]
    async fn test_must_have_and_avoid_phrases() {
        let c = extractor()
            .extract("Must have ocean views, avoid crowded tourist traps")
            .await;

        assert!(c.must_have.iter().any(|p| p.contains("ocean views")));
        assert!(c.must_avoid.iter().any(|p| p.contains("crowded tourist traps")));
    }

    #[test]
    fn test_parse_absolute_date_formats() {
        for s in ["2027-05-10", "2027/05/10", "05/10/2027", "May 10, 2027"] {
            let parsed = parse_absolute_date(s).unwrap();
            assert_eq!(parsed.date_naive().to_string(), "2027-05-10", "failed for {s}");
        }
        assert!(parse_absolute_date("not a date").is_none());
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("{}"), "{}");
    }

    #[test]
    fn test_derive_duration() {
        let start = Utc::now();
        assert_eq!(derive_duration(Some(start), Some(start + Duration::days(5))), Some(5));
        assert_eq!(derive_duration(Some(start), Some(start - Duration::days(1))), None);
        assert_eq!(derive_duration(None, Some(start)), None);
    }

    #[tokio::test]
    async fn test_stage_process_logs_and_stores() {
        let mut session = Session::new("Plan a 3-day trip to Paris for 2 people with a budget of $2000", None);
        session = extractor().process(session).await.unwrap();

        assert!(session.parsed_constraints.is_some());
        assert!(session.execution_trace.iter().any(|l| l.contains("parse: Starting query parsing")));
    }
}
