//! Keyword and pattern based classification.
//!
//! All matching runs on an ASCII-lowercased copy of the whitespace-normalised
//! query, so byte offsets line up with the original text and place names keep
//! their casing. Spans already claimed (places, detours, POI phrases) are
//! blanked before later passes so "car park" never reads as driving and
//! "train station" never reads as public transport.

use std::ops::Range;
use std::sync::LazyLock;

use async_trait::async_trait;
use geoscout_core::{
    ClassifiedQuery, Complexity, ConversationRole, IntentKind, Location, PlaceRef, PoiType,
    QueryContext, QueryEntities, TransportMode, UseCaseError,
};
use regex::Regex;

use super::QueryClassifier;

pub const DEFAULT_WITHIN_MINUTES: u32 = 15;
pub const DEFAULT_NEAR_POI_MINUTES: u32 = 10;
pub const DEFAULT_ENROUTE_TOTAL_MINUTES: u32 = 180;
pub const DEFAULT_DETOUR_MINUTES: u32 = 10;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

static ENROUTE_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:on (?:the|my) way to|en route to|along the way to|on my route to)\b")
        .expect("valid enroute regex")
});

/// Where a place name stops: a constraint keyword or punctuation.
static PLACE_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\s+(?:by|within|under|with|without|no more than|max|maximum|driving|walking|cycling|taking|for|and|but|that|which)\b|[,;!?]|\.(?:\s|$)",
    )
    .expect("valid place-end regex")
});

static COORDINATE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*-?\d{1,2}(?:\.\d+)?\s*,\s*-?\d{1,3}(?:\.\d+)?")
        .expect("valid coordinate regex")
});

static ORIGIN_OF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:min(?:ute)?s?|walk|drive|ride|cycle)\s+(?:of|from)\s+")
        .expect("valid origin regex")
});

static ORIGIN_NEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:near|around|close to|next to|not far from)\s+").expect("valid origin regex")
});

static SELF_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:me|us|here|you|my (?:current )?location|where i am|my place)\b")
        .expect("valid self-reference regex")
});

static DETOUR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(\d+)\s*-?\s*(?:min(?:ute)?s?\s+)?(?:detour|out of (?:the|my) way)|(?:detour|out of (?:the|my) way)\D{0,24}?(\d+)",
    )
    .expect("valid detour regex")
});

static MINUTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*-?\s*min(?:ute)?s?\b").expect("valid minutes regex"));

static HOURS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)\s*-?\s*(?:hours?|hrs?)\b").expect("valid hours regex")
});

static HALF_HOUR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bhalf(?: an)? hour\b").expect("valid half-hour regex"));

static QUARTER_HOUR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bquarter (?:of )?(?:an )?hour\b").expect("valid quarter-hour regex")
});

static AN_HOUR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:an|one) hour\b").expect("valid hour regex"));

static TRANSPORT: LazyLock<[(TransportMode, Regex); 4]> = LazyLock::new(|| {
    [
        (
            TransportMode::Walking,
            Regex::new(r"\b(?:walk(?:ing|able)?|on foot|by foot|stroll(?:ing)?)\b")
                .expect("valid walking regex"),
        ),
        (
            TransportMode::Cycling,
            Regex::new(r"\b(?:cycl(?:e|ing)|bik(?:e|ing)|bicycle)\b").expect("valid cycling regex"),
        ),
        (
            TransportMode::Driving,
            Regex::new(r"\b(?:driv(?:e|ing)|by car|in (?:a|the|my) car|car ride)\b")
                .expect("valid driving regex"),
        ),
        (
            TransportMode::PublicTransport,
            Regex::new(r"\b(?:public transport|transit|bus|metro|subway|tram|tube|by train)\b")
                .expect("valid transit regex"),
        ),
    ]
});

static CUISINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(italian|chinese|indian|thai|japanese|mexican|french|greek|turkish|spanish|korean|vietnamese|lebanese|american|vegan|vegetarian|sushi|pizza|burger|seafood)\b",
    )
    .expect("valid cuisine regex")
});

static NEAREST_CUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:nearest|closest)\b").expect("valid nearest regex"));

static NEAR_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:near|nearby|close to|next to|around|beside|adjacent to|not far from|(?:min(?:ute)?s?|walk|drive|ride) (?:of|from))\b",
    )
    .expect("valid proximity regex")
});

static FOLLOW_UP_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:similar|same|another|what about|how about|instead|again|show me more|more like|any others?)\b",
    )
    .expect("valid follow-up regex")
});

/// Everything the patterns found in one query.
#[derive(Debug, Default)]
struct Slots {
    mentions: Vec<(Range<usize>, PoiType)>,
    transport: Option<TransportMode>,
    time_minutes: Option<u32>,
    detour_minutes: Option<u32>,
    cuisine: Option<String>,
    enroute_cue: bool,
    destination: Option<PlaceRef>,
    origin: Option<PlaceRef>,
    nearest_at: Option<usize>,
    near_cue: bool,
    follow_up: bool,
}

impl Slots {
    fn primary(&self) -> Option<PoiType> {
        self.mentions.first().map(|(_, t)| *t)
    }

    /// "nearest"/"closest" sits between the first and second POI phrase,
    /// e.g. "cafes near the nearest park".
    fn anchored_on_nearest(&self) -> bool {
        match (self.nearest_at, self.mentions.get(0..2)) {
            (Some(at), Some([(first, _), (second, _)])) => first.end <= at && at < second.start,
            _ => false,
        }
    }

    fn has_own_intent(&self) -> bool {
        self.enroute_cue || self.nearest_at.is_some() || (self.mentions.len() >= 2 && self.near_cue)
    }
}

/// Deterministic classifier built from keyword tables and regular
/// expressions. Needs no network access.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedClassifier;

impl RuleBasedClassifier {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Synchronous core of [`QueryClassifier::classify`].
    ///
    /// # Errors
    ///
    /// `VALIDATION_ERROR` when `text` is empty or whitespace.
    pub fn analyze(
        &self,
        text: &str,
        context: &QueryContext,
    ) -> Result<ClassifiedQuery, UseCaseError> {
        let norm = WHITESPACE.replace_all(text.trim(), " ").into_owned();
        if norm.is_empty() {
            return Err(UseCaseError::validation("query text must not be empty"));
        }

        let slots = extract(&norm);
        let mut notes = Vec::new();

        if slots.follow_up && !slots.has_own_intent() {
            if let Some(previous) = self.previous_classification(context) {
                if let Some(entities) = inherit(&previous, &slots) {
                    notes.push(format!(
                        "follow-up: inherited {} from the previous query",
                        previous.intent()
                    ));
                    let overrides = explicit_slot_count(&slots);
                    if overrides > 0 {
                        notes.push(format!("{overrides} slot(s) overridden by this query"));
                    }
                    let complexity = match &entities {
                        QueryEntities::NearPoi { .. } => previous.complexity,
                        other => complexity_for(other, false),
                    };
                    #[allow(clippy::cast_precision_loss)]
                    let confidence = 0.6 + 0.1 * overrides as f64;
                    return Ok(ClassifiedQuery::new(
                        entities,
                        complexity,
                        confidence.min(0.9),
                        true,
                        notes.join("; "),
                    ));
                }
            }
            notes.push("follow-up cue without a usable previous query".to_owned());
        }

        let (transport, transport_explicit) = resolve_transport(&slots, context, &mut notes);
        let mut confidence = 0.5;
        if transport_explicit {
            confidence += 0.15;
        }

        let mut primary = slots.primary();
        if primary.is_none() && slots.cuisine.is_some() {
            primary = Some(PoiType::Restaurant);
            notes.push("cuisine implies restaurant".to_owned());
        }
        if primary.is_none() {
            let favorite = context
                .preferences
                .as_ref()
                .and_then(|p| p.favorite_poi_types.first().copied());
            if let Some(poi_type) = favorite {
                // A guess, so it only clears the threshold with other slots.
                primary = Some(poi_type);
                confidence -= 0.2;
                notes.push(format!("{poi_type} from preferences"));
            }
        }
        if let Some(poi_type) = primary {
            notes.push(format!("looking for {poi_type}"));
        }

        let entities = if slots.enroute_cue {
            match (primary, slots.destination.clone()) {
                (Some(poi_type), Some(destination)) => {
                    confidence += 0.1;
                    notes.push(format!("en-route cue, destination {}", describe(&destination)));
                    let max_total_time_minutes = time_or_default(
                        slots.time_minutes,
                        DEFAULT_ENROUTE_TOTAL_MINUTES,
                        "total time",
                        &mut confidence,
                        &mut notes,
                    );
                    let max_detour_minutes = match slots.detour_minutes {
                        Some(minutes) => {
                            confidence += 0.05;
                            notes.push(format!("detour {minutes} min"));
                            minutes
                        }
                        None => {
                            notes.push(format!("detour defaulted to {DEFAULT_DETOUR_MINUTES} min"));
                            DEFAULT_DETOUR_MINUTES
                        }
                    };
                    QueryEntities::Enroute {
                        poi_type,
                        destination,
                        transport,
                        max_total_time_minutes,
                        max_detour_minutes,
                    }
                }
                (_, None) => {
                    notes.push("en-route cue without a destination".to_owned());
                    unknown(primary, &slots)
                }
                (None, Some(_)) => {
                    notes.push("en-route cue without anything to look for".to_owned());
                    unknown(primary, &slots)
                }
            }
        } else if let (Some(poi_type), Some((_, secondary_type)), true) =
            (primary, slots.mentions.get(1), slots.near_cue)
        {
            confidence += 0.1;
            notes.push(format!("proximity cue, anchored on {secondary_type}"));
            let max_time_from_secondary_minutes = time_or_default(
                slots.time_minutes,
                DEFAULT_NEAR_POI_MINUTES,
                "time from anchor",
                &mut confidence,
                &mut notes,
            );
            QueryEntities::NearPoi {
                primary_type: poi_type,
                secondary_type: *secondary_type,
                transport,
                max_time_from_secondary_minutes,
                cuisine: slots.cuisine.clone(),
            }
        } else if let (Some(poi_type), Some(_)) = (primary, slots.nearest_at) {
            confidence += 0.25;
            notes.push("nearest cue".to_owned());
            QueryEntities::Nearest {
                poi_type,
                transport,
                origin: slots.origin.clone(),
            }
        } else if let Some(poi_type) = primary {
            let time_minutes = time_or_default(
                slots.time_minutes,
                DEFAULT_WITHIN_MINUTES,
                "time",
                &mut confidence,
                &mut notes,
            );
            QueryEntities::WithinTime {
                poi_type,
                time_minutes,
                transport,
                cuisine: slots.cuisine.clone(),
                origin: slots.origin.clone(),
            }
        } else {
            notes.push("no place type recognised".to_owned());
            unknown(None, &slots)
        };

        if let QueryEntities::Unknown { .. } = entities {
            let evidence = transport_explicit || slots.time_minutes.is_some() || primary.is_some();
            confidence = if evidence { 0.2 } else { 0.05 };
        }
        if let Some(origin) = entities_origin(&entities) {
            notes.push(format!("searching from {}", describe(origin)));
        }

        let complexity = complexity_for(&entities, slots.anchored_on_nearest());
        if complexity == Complexity::MultiStep {
            notes.push("needs a preparatory step".to_owned());
        }
        tracing::debug!(
            intent = %entities.intent(),
            confidence,
            "query classified"
        );
        Ok(ClassifiedQuery::new(
            entities,
            complexity,
            confidence,
            false,
            notes.join("; "),
        ))
    }

    /// The last executed classification, or failing that the most recent
    /// classifiable user turn in the history.
    fn previous_classification(&self, context: &QueryContext) -> Option<ClassifiedQuery> {
        if let Some(last) = &context.last_classification {
            return Some(last.clone());
        }
        context
            .history
            .iter()
            .rev()
            .filter(|turn| turn.role == ConversationRole::User)
            .filter_map(|turn| self.analyze(&turn.content, &QueryContext::default()).ok())
            .find(|c| c.intent() != IntentKind::Unknown)
    }
}

#[async_trait]
impl QueryClassifier for RuleBasedClassifier {
    async fn classify(
        &self,
        text: &str,
        context: &QueryContext,
    ) -> Result<ClassifiedQuery, UseCaseError> {
        self.analyze(text, context)
    }
}

fn extract(norm: &str) -> Slots {
    let mut slots = Slots::default();
    let mut masked = norm.to_ascii_lowercase();

    let enroute_cue_end = ENROUTE_CUE.find(&masked).map(|m| m.end());
    if let Some(cue_end) = enroute_cue_end {
        slots.enroute_cue = true;
        if let Some((place, span)) = place_after(norm, cue_end) {
            slots.destination = Some(place);
            blank(&mut masked, span);
        }
    } else if let Some((place, span)) = free_text_origin(norm, &masked) {
        slots.origin = Some(place);
        blank(&mut masked, span);
    }

    let detour = DETOUR.captures(&masked).and_then(|caps| {
        let minutes = caps.get(1).or_else(|| caps.get(2))?.as_str().parse().ok();
        Some((caps.get(0)?.range(), minutes))
    });
    if let Some((span, minutes)) = detour {
        slots.detour_minutes = minutes;
        blank(&mut masked, span);
    }

    slots.mentions = PoiType::mentions(&masked);
    for (span, _) in &slots.mentions {
        blank(&mut masked, span.clone());
    }

    slots.transport = TRANSPORT
        .iter()
        .filter_map(|(mode, re)| re.find(&masked).map(|m| (m.start(), *mode)))
        .min_by_key(|(start, _)| *start)
        .map(|(_, mode)| mode);
    slots.time_minutes = minutes_in(&masked);
    slots.cuisine = CUISINE.find(&masked).map(|m| m.as_str().to_owned());
    slots.nearest_at = NEAREST_CUE.find(&masked).map(|m| m.start());
    slots.near_cue = NEAR_CUE.is_match(&masked);
    slots.follow_up = FOLLOW_UP_CUE.is_match(&masked);
    slots
}

/// Replaces a byte span with spaces, keeping every other offset intact.
fn blank(masked: &mut String, span: Range<usize>) {
    let width = span.len();
    masked.replace_range(span, &" ".repeat(width));
}

/// The place named in `norm` starting at byte `from`: `lat,lng`
/// coordinates or free text up to the next constraint keyword.
fn place_after(norm: &str, from: usize) -> Option<(PlaceRef, Range<usize>)> {
    let tail = &norm[from..];
    if let Some(coords) = COORDINATE_PREFIX.find(tail) {
        if let Ok(location) = coords.as_str().trim().parse::<Location>() {
            return Some((PlaceRef::Coordinates(location), from..from + coords.end()));
        }
    }
    let end = PLACE_END.find(tail).map_or(tail.len(), |m| m.start());
    let raw = &tail[..end];
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    let start = from + (raw.len() - raw.trim_start().len());
    Some((PlaceRef::Text(text.to_owned()), start..start + text.len()))
}

/// A place the search should start from instead of the user, e.g. "within
/// 10 minutes walk of King's Cross" or "pharmacies near Soho Square".
fn free_text_origin(norm: &str, lower: &str) -> Option<(PlaceRef, Range<usize>)> {
    ORIGIN_OF
        .find_iter(lower)
        .chain(ORIGIN_NEAR.find_iter(lower))
        .filter_map(|cue| place_after(norm, cue.end()))
        .find(|(place, span)| {
            let candidate = &lower[span.clone()];
            match place {
                PlaceRef::Coordinates(_) => true,
                PlaceRef::Text(_) => {
                    !SELF_REFERENCE.is_match(candidate)
                        && PoiType::mentions(candidate).is_empty()
                        && !NEAREST_CUE.is_match(candidate)
                        && minutes_in(candidate).is_none()
                }
            }
        })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn minutes_in(text: &str) -> Option<u32> {
    if let Some(caps) = MINUTES.captures(text) {
        return caps.get(1).and_then(|m| m.as_str().parse().ok());
    }
    if let Some(caps) = HOURS.captures(text) {
        let hours: f64 = caps.get(1)?.as_str().parse().ok()?;
        return Some((hours * 60.0).round() as u32);
    }
    if HALF_HOUR.is_match(text) {
        return Some(30);
    }
    if QUARTER_HOUR.is_match(text) {
        return Some(15);
    }
    AN_HOUR.is_match(text).then_some(60)
}

fn resolve_transport(
    slots: &Slots,
    context: &QueryContext,
    notes: &mut Vec<String>,
) -> (TransportMode, bool) {
    if let Some(mode) = slots.transport {
        notes.push(format!("transport {mode}"));
        return (mode, true);
    }
    let preferred = context
        .preferences
        .as_ref()
        .and_then(|p| p.favorite_transport_modes.first().copied());
    if let Some(mode) = preferred {
        notes.push(format!("transport {mode} from preferences"));
        return (mode, false);
    }
    notes.push("transport defaulted to walking".to_owned());
    (TransportMode::Walking, false)
}

fn time_or_default(
    explicit: Option<u32>,
    default: u32,
    label: &str,
    confidence: &mut f64,
    notes: &mut Vec<String>,
) -> u32 {
    if let Some(minutes) = explicit {
        *confidence += 0.15;
        notes.push(format!("{label} {minutes} min"));
        minutes
    } else {
        notes.push(format!("{label} defaulted to {default} min"));
        default
    }
}

fn unknown(poi_type: Option<PoiType>, slots: &Slots) -> QueryEntities {
    QueryEntities::Unknown {
        poi_type,
        transport: slots.transport,
    }
}

fn describe(place: &PlaceRef) -> String {
    match place {
        PlaceRef::Coordinates(location) => location.to_string(),
        PlaceRef::Text(text) => format!("\"{text}\""),
    }
}

fn entities_origin(entities: &QueryEntities) -> Option<&PlaceRef> {
    match entities {
        QueryEntities::WithinTime { origin, .. } | QueryEntities::Nearest { origin, .. } => {
            origin.as_ref()
        }
        _ => None,
    }
}

fn complexity_for(entities: &QueryEntities, anchored_on_nearest: bool) -> Complexity {
    let multi_step = match entities {
        QueryEntities::WithinTime { origin, .. } | QueryEntities::Nearest { origin, .. } => {
            origin.as_ref().is_some_and(PlaceRef::needs_geocoding)
        }
        QueryEntities::NearPoi { .. } => anchored_on_nearest,
        QueryEntities::Enroute { destination, .. } => destination.needs_geocoding(),
        QueryEntities::Unknown { .. } => false,
    };
    if multi_step {
        Complexity::MultiStep
    } else {
        Complexity::Simple
    }
}

fn explicit_slot_count(slots: &Slots) -> usize {
    [
        slots.primary().is_some(),
        slots.transport.is_some(),
        slots.time_minutes.is_some(),
        slots.cuisine.is_some(),
        slots.detour_minutes.is_some(),
        slots.origin.is_some(),
    ]
    .into_iter()
    .filter(|found| *found)
    .count()
}

/// The previous query's entities with every slot this query states
/// explicitly replaced. `None` when there is nothing to inherit.
fn inherit(previous: &ClassifiedQuery, slots: &Slots) -> Option<QueryEntities> {
    let poi = slots.primary();
    // a new place type makes the old cuisine meaningless
    let keep_cuisine = |old: Option<String>| {
        slots
            .cuisine
            .clone()
            .or_else(|| if poi.is_none() { old } else { None })
    };
    let entities = match previous.entities.clone() {
        QueryEntities::WithinTime {
            poi_type,
            time_minutes,
            transport,
            cuisine,
            origin,
        } => QueryEntities::WithinTime {
            poi_type: poi.unwrap_or(poi_type),
            time_minutes: slots.time_minutes.unwrap_or(time_minutes),
            transport: slots.transport.unwrap_or(transport),
            cuisine: keep_cuisine(cuisine),
            origin: slots.origin.clone().or(origin),
        },
        QueryEntities::Nearest {
            poi_type,
            transport,
            origin,
        } => QueryEntities::Nearest {
            poi_type: poi.unwrap_or(poi_type),
            transport: slots.transport.unwrap_or(transport),
            origin: slots.origin.clone().or(origin),
        },
        QueryEntities::NearPoi {
            primary_type,
            secondary_type,
            transport,
            max_time_from_secondary_minutes,
            cuisine,
        } => QueryEntities::NearPoi {
            primary_type: poi.unwrap_or(primary_type),
            secondary_type,
            transport: slots.transport.unwrap_or(transport),
            max_time_from_secondary_minutes: slots
                .time_minutes
                .unwrap_or(max_time_from_secondary_minutes),
            cuisine: keep_cuisine(cuisine),
        },
        QueryEntities::Enroute {
            poi_type,
            destination,
            transport,
            max_total_time_minutes,
            max_detour_minutes,
        } => QueryEntities::Enroute {
            poi_type: poi.unwrap_or(poi_type),
            destination: slots.destination.clone().unwrap_or(destination),
            transport: slots.transport.unwrap_or(transport),
            max_total_time_minutes: slots.time_minutes.unwrap_or(max_total_time_minutes),
            max_detour_minutes: slots.detour_minutes.unwrap_or(max_detour_minutes),
        },
        QueryEntities::Unknown { .. } => return None,
    };
    Some(entities)
}

#[cfg(test)]
#[path = "rules_test.rs"]
mod tests;
