// Results-page HTML parsing
use crate::config::{compile_selector, ConfigError, RemoteConfig};
use crate::model::{CollegeVotes, ExtractedFields, ExtractionError, PopularVotes, RegionOutcome};
use crate::normalizer::normalize_fill;
use crate::parser::dates::parse_loose_datetime;
use crate::utils::{parse_leading_int, second_line, strip_label, strip_separators};
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use tracing::warn;

pub trait Parser: Send + Sync {
    fn parse(&self, html: &str) -> Result<ExtractedFields, ExtractionError>;
}

pub struct ResultsParser {
    college_biden: Selector,
    college_trump: Selector,
    college_remaining: Option<Selector>,
    popular_biden: Selector,
    popular_trump: Selector,
    label_chars: usize,
    regions: Selector,
    region_attribute: String,
    fill_attribute: String,
    updated: Selector,
}

impl ResultsParser {
    pub fn from_config(remote: &RemoteConfig) -> Result<Self, ConfigError> {
        let college_remaining = match &remote.college.remaining {
            Some(selector) => Some(compile_selector("college.remaining", selector)?),
            None => None,
        };

        Ok(Self {
            college_biden: compile_selector("college.biden", &remote.college.biden)?,
            college_trump: compile_selector("college.trump", &remote.college.trump)?,
            college_remaining,
            popular_biden: compile_selector("popular.biden", &remote.popular.biden)?,
            popular_trump: compile_selector("popular.trump", &remote.popular.trump)?,
            label_chars: remote.popular.label_chars,
            regions: compile_selector("regions", &remote.regions)?,
            region_attribute: remote.region_attribute.clone(),
            fill_attribute: remote.fill_attribute.clone(),
            updated: compile_selector("updated", &remote.updated)?,
        })
    }

    /// Same as [`Parser::parse`], with relative dates resolved against `now`.
    pub fn parse_at(&self, html: &str, now: DateTime<Utc>) -> Result<ExtractedFields, ExtractionError> {
        let document = Html::parse_document(html);

        let college = CollegeVotes {
            biden: college_count(&document, &self.college_biden, "college.biden")?,
            trump: college_count(&document, &self.college_trump, "college.trump")?,
            remaining: match &self.college_remaining {
                Some(selector) => Some(plain_count(&document, selector, "college.remaining")?),
                None => None,
            },
        };

        let popular = PopularVotes {
            biden: self.popular_count(&document, &self.popular_biden, "popular.biden")?,
            trump: self.popular_count(&document, &self.popular_trump, "popular.trump")?,
        };

        Ok(ExtractedFields {
            college,
            popular,
            regions: self.region_outcomes(&document),
            reported_update: self.reported_update(&document, now),
        })
    }

    fn popular_count(
        &self,
        document: &Html,
        selector: &Selector,
        field: &'static str,
    ) -> Result<u64, ExtractionError> {
        let text = element_text(document, selector, field)?;
        let digits = strip_separators(strip_label(&text, self.label_chars));
        parse_leading_int(&digits).ok_or(ExtractionError::InvalidNumber { field, text })
    }

    /// Children of the container without both attributes contribute nothing.
    fn region_outcomes(&self, document: &Html) -> BTreeMap<String, RegionOutcome> {
        let mut outcomes = BTreeMap::new();

        let Some(container) = document.select(&self.regions).next() else {
            warn!("Region container not found, no region outcomes this run");
            return outcomes;
        };

        for child in container.children().filter_map(ElementRef::wrap) {
            let element = child.value();
            if let (Some(region), Some(fill)) = (
                element.attr(&self.region_attribute),
                element.attr(&self.fill_attribute),
            ) {
                outcomes.insert(region.to_string(), normalize_fill(fill));
            }
        }

        outcomes
    }

    fn reported_update(&self, document: &Html, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let Some(element) = document.select(&self.updated).next() else {
            warn!("Update time element not found");
            return None;
        };

        let text = element.text().collect::<String>();
        let parsed = parse_loose_datetime(&text, now);
        if parsed.is_none() {
            warn!("Could not parse reported update time from {:?}", text.trim());
        }
        parsed
    }
}

impl Parser for ResultsParser {
    fn parse(&self, html: &str) -> Result<ExtractedFields, ExtractionError> {
        self.parse_at(html, Utc::now())
    }
}

fn element_text(
    document: &Html,
    selector: &Selector,
    field: &'static str,
) -> Result<String, ExtractionError> {
    document
        .select(selector)
        .next()
        .map(|element| element.text().collect::<String>())
        .ok_or(ExtractionError::MissingNode { field })
}

/// Electoral counts sit on the second line of their element.
fn college_count(
    document: &Html,
    selector: &Selector,
    field: &'static str,
) -> Result<u32, ExtractionError> {
    let text = element_text(document, selector, field)?;
    second_line(&text)
        .and_then(parse_leading_int)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or(ExtractionError::InvalidNumber { field, text })
}

fn plain_count(
    document: &Html,
    selector: &Selector,
    field: &'static str,
) -> Result<u32, ExtractionError> {
    let text = element_text(document, selector, field)?;
    parse_leading_int(&text)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or(ExtractionError::InvalidNumber { field, text })
}
