use regex::Regex;
use std::future::Future;
use std::sync::LazyLock;

use crate::config::{ClassifierBackend, ClassifierConfig};
use crate::error::LensError;
use crate::query::intent::{AggregateFn, AggregationHint, Classification, Entities, IntentKind, PriceFilter};
use crate::service::remote_classifier::RemoteClassifier;

/// Turns a free-text question into a typed intent.
///
/// Implementations must not fail on ambiguous text; they return
/// `IntentKind::Unknown` instead. `Err` is reserved for the backend itself
/// being unreachable.
pub trait IntentClassifier: Send + Sync {
    fn classify(&self, text: &str)
    -> impl Future<Output = Result<Classification, LensError>> + Send;
}

/// Classifier chosen at startup from `classifier.backend`.
pub enum Classifier {
    Keyword(KeywordClassifier),
    Remote(RemoteClassifier),
}

impl Classifier {
    pub fn from_config(cfg: &ClassifierConfig) -> Result<Self, LensError> {
        match cfg.backend {
            ClassifierBackend::Keyword => Ok(Self::Keyword(KeywordClassifier::new())),
            ClassifierBackend::Remote => Ok(Self::Remote(RemoteClassifier::new(cfg)?)),
        }
    }
}

impl IntentClassifier for Classifier {
    async fn classify(&self, text: &str) -> Result<Classification, LensError> {
        match self {
            Self::Keyword(k) => Ok(k.classify_text(text)),
            Self::Remote(r) => r.classify(text).await,
        }
    }
}

/// Local rule-based classifier. Deterministic and infallible.
#[derive(Debug, Clone, Default)]
pub struct KeywordClassifier;

impl IntentClassifier for KeywordClassifier {
    async fn classify(&self, text: &str) -> Result<Classification, LensError> {
        Ok(self.classify_text(text))
    }
}

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify_text(&self, text: &str) -> Classification {
        let lower = text.to_lowercase();
        if lower.trim().is_empty() {
            return Classification::unknown();
        }

        let entities = extract_entities(text, &lower);
        let filters = extract_price_filter(&lower);
        let (kind, confidence) = detect_intent(&lower, &entities, &filters);

        let mut c = Classification::new(kind, confidence);
        match kind {
            IntentKind::Aggregate => c.aggregation = Some(aggregate_hint(&lower)),
            IntentKind::Financial => c.aggregation = Some(financial_hint(&lower)),
            IntentKind::GroupBy => {
                c.group_by = GROUP_BY_PATTERN
                    .captures(&lower)
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().to_string());
                c.aggregation = Some(aggregate_hint(&lower))
                    .filter(|hint| hint.function != AggregateFn::Count);
            }
            _ => {}
        }
        c.entities = entities;
        c.filters = filters;
        c
    }
}

fn detect_intent(lower: &str, entities: &Entities, filters: &PriceFilter) -> (IntentKind, f64) {
    let has_criteria = !entities.is_empty() || !filters.is_empty();

    // Mutations only for imperative commands; questions never write.
    let command = !lower.trim_end().ends_with('?');
    if command && DELETE_PATTERN.is_match(lower) {
        return (IntentKind::Delete, 0.9);
    }
    if command && INSERT_PATTERN.is_match(lower) {
        return (IntentKind::Insert, 0.85);
    }
    if command && UPDATE_PATTERN.is_match(lower) {
        return (IntentKind::Update, 0.85);
    }
    if GROUP_BY_PATTERN.is_match(lower) || BREAKDOWN_PATTERN.is_match(lower) {
        return (IntentKind::GroupBy, 0.9);
    }
    // "in maintenance" is a status and "maintenance department" a department,
    // neither is a schedule question.
    let maintenance_status = entities.status.as_deref() == Some("In Maintenance");
    let maintenance_dept = entities.department.as_deref() == Some("Maintenance");
    if MAINTENANCE_PATTERN.is_match(lower) && !maintenance_status && !maintenance_dept {
        return (IntentKind::Maintenance, 0.9);
    }
    if COUNT_PATTERN.is_match(lower) {
        return (IntentKind::Aggregate, 0.85);
    }
    if FINANCIAL_PATTERN.is_match(lower) {
        return (IntentKind::Financial, 0.85);
    }
    if AGGREGATE_PATTERN.is_match(lower) {
        return (IntentKind::Aggregate, 0.85);
    }
    if entities.status.is_some() {
        return (IntentKind::Status, 0.8);
    }
    match (LIST_PATTERN.is_match(lower), has_criteria) {
        (true, true) => (IntentKind::Filtered, 0.8),
        (true, false) if EQUIPMENT_WORD_PATTERN.is_match(lower) => (IntentKind::Filtered, 0.6),
        (false, true) => (IntentKind::Filtered, 0.5),
        _ => (IntentKind::Unknown, 0.0),
    }
}

fn aggregate_hint(lower: &str) -> AggregationHint {
    let column = if PRICE_WORD_PATTERN.is_match(lower) {
        Some("purchase_price".to_string())
    } else if VALUE_WORD_PATTERN.is_match(lower) {
        Some("current_value".to_string())
    } else {
        None
    };

    let function = if AVG_PATTERN.is_match(lower) {
        AggregateFn::Avg
    } else if MIN_PATTERN.is_match(lower) {
        AggregateFn::Min
    } else if MAX_PATTERN.is_match(lower) {
        AggregateFn::Max
    } else if COUNT_PATTERN.is_match(lower) {
        return AggregationHint {
            function: AggregateFn::Count,
            column: None,
        };
    } else if VALUE_WORD_PATTERN.is_match(lower) || SUM_PATTERN.is_match(lower) {
        AggregateFn::Sum
    } else if column.is_some() {
        AggregateFn::Avg
    } else {
        AggregateFn::Count
    };

    let column = match function {
        AggregateFn::Count => None,
        AggregateFn::Avg => column.or_else(|| Some("purchase_price".to_string())),
        _ => column.or_else(|| Some("current_value".to_string())),
    };
    AggregationHint { function, column }
}

fn financial_hint(lower: &str) -> AggregationHint {
    let column = if DEPRECIATION_PATTERN.is_match(lower) {
        "depreciation"
    } else if PURCHASE_SPEND_PATTERN.is_match(lower) {
        "purchase_price"
    } else {
        "current_value"
    };
    let function = if AVG_PATTERN.is_match(lower) {
        AggregateFn::Avg
    } else {
        AggregateFn::Sum
    };
    AggregationHint {
        function,
        column: Some(column.to_string()),
    }
}

fn extract_entities(original: &str, lower: &str) -> Entities {
    let mut entities = Entities::default();

    // Category phrases are blanked out so "IT equipment" or "medical devices"
    // do not also read as a department.
    let mut remaining = lower.to_string();
    for (pattern, category) in CATEGORY_PATTERNS.iter() {
        if let Some(m) = pattern.find(lower) {
            entities.category = Some((*category).to_string());
            remaining.replace_range(m.range(), &" ".repeat(m.len()));
            break;
        }
    }

    let it_in_original = entities.category.as_deref() != Some("IT Equipment")
        && IT_DEPARTMENT_PATTERN.is_match(original);
    if it_in_original || IT_DEPARTMENT_WORD_PATTERN.is_match(&remaining) {
        entities.department = Some("IT".to_string());
    } else {
        entities.department = DEPARTMENT_PATTERNS
            .iter()
            .find(|(pattern, _)| pattern.is_match(&remaining))
            .map(|(_, department)| (*department).to_string());
    }

    entities.status = STATUS_PATTERNS
        .iter()
        .find(|(pattern, _)| pattern.is_match(lower))
        .map(|(_, status)| (*status).to_string());

    entities.condition = if NEEDS_REPAIR_PATTERN.is_match(lower) {
        Some("Needs Repair".to_string())
    } else {
        CONDITION_PATTERN
            .captures(lower)
            .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
            .map(|m| capitalize(m.as_str()))
    };

    entities.equipment_name = EQUIPMENT_NAME_PATTERN
        .captures(lower)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());

    entities.asset_tag = ASSET_TAG_PATTERN
        .find(original)
        .map(|m| m.as_str().to_ascii_uppercase());

    entities
}

fn extract_price_filter(lower: &str) -> PriceFilter {
    if let Some(caps) = PRICE_BETWEEN_PATTERN.captures(lower) {
        let low = parse_amount(&caps[1], caps.get(2).map(|m| m.as_str()));
        let high = parse_amount(&caps[3], caps.get(4).map(|m| m.as_str()));
        if let (Some(a), Some(b)) = (low, high) {
            return PriceFilter {
                price_min: Some(a.min(b)),
                price_max: Some(a.max(b)),
            };
        }
    }

    let bound = |pattern: &Regex| {
        pattern.captures_iter(lower).find_map(|caps| {
            let suffix = caps.get(2).map(|m| m.as_str());
            if suffix.is_some_and(is_time_unit) {
                return None;
            }
            parse_amount(&caps[1], suffix)
        })
    };
    PriceFilter {
        price_min: bound(&PRICE_MIN_PATTERN),
        price_max: bound(&PRICE_MAX_PATTERN),
    }
}

fn is_time_unit(word: &str) -> bool {
    matches!(
        word,
        "day" | "days" | "week" | "weeks" | "month" | "months" | "year" | "years"
    )
}

fn parse_amount(digits: &str, suffix: Option<&str>) -> Option<f64> {
    let base: f64 = digits.replace(',', "").parse().ok()?;
    let multiplier = match suffix {
        Some("k") => 1_000.0,
        Some("m") => 1_000_000.0,
        _ => 1.0,
    };
    Some(base * multiplier)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("Invalid regex")
}

// Intent patterns
static DELETE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"^\s*(?:please\s+)?(delete|remove|dispose\s+of|decommission)\b"));
static INSERT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"^\s*(?:please\s+)?(add|register|insert|create)\b\s+(a\s+|an\s+|new\s+|the\s+)*\w")
});
static UPDATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"^\s*(?:please\s+)?(update|change|set|mark|move|reassign|transfer)\b"));
static GROUP_BY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"\b(?:by|per|each|across)\s+(department|category|categories|status|statuses|location|condition)s?\b")
});
static BREAKDOWN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\b(breakdown|broken\s+down|grouped|distribution)\b"));
static MAINTENANCE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\bmaintenance\b|\bservic(e|ing)\s+(due|schedule)|\bdue\s+for\s+service"));
static FINANCIAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"\b(depreciat\w*|financial|book\s+value|spend|spent|spending|costs?|expenditure)\b")
});
static AGGREGATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"\b(how\s+many|count|total|sum|average|avg|mean|number\s+of|minimum|maximum|cheapest|most\s+expensive|worth)\b")
});
static LIST_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\b(show|list|find|which|display|get|what|give|see)\b"));
static EQUIPMENT_WORD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\b(equipment|assets?|items?|inventory|devices?)\b"));

// Aggregation hints
static AVG_PATTERN: LazyLock<Regex> = LazyLock::new(|| pattern(r"\b(average|avg|mean)\b"));
static MIN_PATTERN: LazyLock<Regex> = LazyLock::new(|| pattern(r"\b(minimum|min|cheapest|lowest)\b"));
static MAX_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\b(maximum|max|most\s+expensive|highest)\b"));
static COUNT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\b(how\s+many|count|number\s+of)\b"));
static SUM_PATTERN: LazyLock<Regex> = LazyLock::new(|| pattern(r"\b(total|sum)\b"));
static VALUE_WORD_PATTERN: LazyLock<Regex> = LazyLock::new(|| pattern(r"\b(value|worth)\b"));
static PRICE_WORD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\b(price|purchase\s+cost|paid)\b"));
static DEPRECIATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| pattern(r"\bdepreciat"));
static PURCHASE_SPEND_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\b(purchase|price|spend|spent|spending|paid|costs?)\b"));

// Entity patterns
static CATEGORY_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (pattern(r"\bit\s+equipment\b"), "IT Equipment"),
        (pattern(r"\bmanufacturing\s+equipment\b"), "Manufacturing Equipment"),
        (pattern(r"\boffice\s+equipment\b"), "Office Equipment"),
        (pattern(r"\bmedical\s+(devices?|equipment)\b"), "Medical Devices"),
        (pattern(r"\bvehicles?\b"), "Vehicles"),
        (pattern(r"\btools\b"), "Tools"),
    ]
});
/// Upper-case `IT` in the original text; lower-case "it" is a pronoun.
static IT_DEPARTMENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| pattern(r"\bIT\b"));
static IT_DEPARTMENT_WORD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\bit\s+(department|dept|team)\b"));
static DEPARTMENT_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (pattern(r"\bengineering\b"), "Engineering"),
        (pattern(r"\bmanufacturing\b"), "Manufacturing"),
        (pattern(r"\boperations\b"), "Operations"),
        (pattern(r"\bfacilities\b"), "Facilities"),
        (pattern(r"\bmedical\b"), "Medical"),
        (pattern(r"\blogistics\b"), "Logistics"),
        (pattern(r"\bmaintenance\s+(department|dept|team)\b"), "Maintenance"),
        (pattern(r"\b(research\s*(&|and)\s*development|r\s*&\s*d)\b"), "Research & Development"),
        (pattern(r"\b(quality\s+assurance|qa)\b"), "Quality Assurance"),
        (pattern(r"\b(hr|human\s+resources)\b"), "HR"),
        (pattern(r"\bfinance\b"), "Finance"),
    ]
});
static STATUS_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (pattern(r"\b(in|under)\s+maintenance\b|\bbeing\s+serviced\b"), "In Maintenance"),
        (pattern(r"\bout\s+of\s+service\b|\bbroken\b|\bnot\s+working\b"), "Out of Service"),
        (pattern(r"\bretired\b"), "Retired"),
        (pattern(r"\bon\s+loan\b|\bloaned\b"), "On Loan"),
        (pattern(r"\bactive\b|\bin\s+use\b"), "Active"),
    ]
});
static NEEDS_REPAIR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\bneed(s|ing)?\s+repairs?\b"));
static CONDITION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"\b(excellent|good|fair|poor)\s+condition\b|\bcondition\b[^.?!]*?\b(?:to|is|as|of)\s+(excellent|good|fair|poor)\b")
});
static EQUIPMENT_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"\b(laptop|monitor|printer|server|webcam|forklift|lathe|welder|drill|saw|grinder|compressor|projector|chair|desk|shredder|van|truck|sedan|suv|defibrillator|ultrasound|wheelchair|ladder|multimeter|wrench)s?\b")
});
static ASSET_TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)\bAST-\d{6}\b"));

// Price filters
const AMOUNT: &str = r"\$?\s*(\d[\d,]*(?:\.\d+)?)";
static PRICE_BETWEEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    pattern(&format!(
        r"\bbetween\s+{AMOUNT}\s*(k|m)?\s+and\s+{AMOUNT}\s*(k|m)?\b"
    ))
});
static PRICE_MIN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    pattern(&format!(
        r"(?:\bover|\babove|\bmore\s+than|\bgreater\s+than|\bat\s+least|\bexceeding|>=?)\s*{AMOUNT}\s*(k|m|days?|weeks?|months?|years?)?\b"
    ))
});
static PRICE_MAX_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    pattern(&format!(
        r"(?:\bunder|\bbelow|\bless\s+than|\bcheaper\s+than|\bat\s+most|\bup\s+to|<=?)\s*{AMOUNT}\s*(k|m|days?|weeks?|months?|years?)?\b"
    ))
});
