use std::collections::HashSet;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::config::Site;
use crate::formats::{HarvestRecord, Review, ShelfTag, ShelvedBook};

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("invalid selector {selector:?}: {message}")]
    InvalidSelector { selector: String, message: String },
    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

pub const DEFAULT_SORT_ORDER: &str = "newest";

pub trait HarvestSource: Send + Sync {
    type Record: HarvestRecord + Send;

    fn target_url(&self, target_id: &str) -> String;

    fn extract(&self, markup: &str, target_id: &str) -> Result<Vec<Self::Record>, ExtractError>;

    fn merge(&self, accumulated: &mut Vec<Self::Record>, page: Vec<Self::Record>) {
        accumulated.extend(page);
    }
}

/// Maps the star widget's tooltip to a rating; unknown phrases have no rating.
pub fn rating_from_phrase(phrase: &str) -> Option<u8> {
    match phrase.trim() {
        "it was amazing" => Some(5),
        "really liked it" => Some(4),
        "liked it" => Some(3),
        "it was ok" => Some(2),
        "did not like it" => Some(1),
        _ => None,
    }
}

/// Leading integer of a phrase like "12 likes"; anything else counts as zero.
pub fn likes_from_phrase(phrase: &str) -> u32 {
    if !phrase.contains("like") {
        return 0;
    }
    phrase
        .split_whitespace()
        .next()
        .and_then(|count| count.replace(',', "").parse().ok())
        .unwrap_or(0)
}

pub fn numeric_book_id(book_id_title: &str) -> &str {
    book_id_title.split('.').next().unwrap_or(book_id_title)
}

fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|err| ExtractError::InvalidSelector {
        selector: css.to_owned(),
        message: err.to_string(),
    })
}

fn pattern(re: &str) -> Result<Regex, ExtractError> {
    Regex::new(re).map_err(|source| ExtractError::InvalidPattern {
        pattern: re.to_owned(),
        source,
    })
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

pub struct ReviewExtractor {
    site: Site,
    sort_order: String,
    review: Selector,
    book_title: Selector,
    rating: Selector,
    user: Selector,
    date: Selector,
    readable: Selector,
    likes: Selector,
    shelves: Selector,
    anchor: Selector,
    digits: Regex,
    shelf_id: Regex,
}

impl ReviewExtractor {
    pub fn new(site: Site, sort_order: impl Into<String>) -> Result<Self, ExtractError> {
        Ok(Self {
            site,
            sort_order: sort_order.into(),
            review: selector("div.review")?,
            book_title: selector("#bookTitle")?,
            rating: selector("span.staticStars")?,
            user: selector("a.user")?,
            date: selector("a.reviewDate.createdAt.right")?,
            readable: selector("span.readable")?,
            likes: selector("span.likesCount")?,
            shelves: selector("div.uitext.greyText.bookshelves")?,
            anchor: selector("a")?,
            digits: pattern("[0-9]+")?,
            shelf_id: pattern(r"\d+.*")?,
        })
    }

    fn parse_review(
        &self,
        node: ElementRef<'_>,
        book_id_title: &str,
        book_title: &str,
    ) -> Option<Review> {
        let review_id = node
            .value()
            .attr("id")
            .and_then(|id| self.digits.find(id))?
            .as_str()
            .to_owned();

        let shelves = self.shelves(node);
        if shelves.is_empty() {
            tracing::debug!(review_id, "review without shelves skipped");
            return None;
        }

        let user = node.select(&self.user).next();

        Some(Review {
            book_id_title: book_id_title.to_owned(),
            book_id: numeric_book_id(book_id_title).to_owned(),
            book_title: book_title.to_owned(),
            review_url: self.site.review_url(&review_id),
            date: node
                .select(&self.date)
                .next()
                .map(text_of)
                .unwrap_or_default(),
            rating: node
                .select(&self.rating)
                .next()
                .and_then(|stars| stars.value().attr("title"))
                .and_then(rating_from_phrase),
            user_name: user
                .and_then(|user| user.value().attr("title"))
                .unwrap_or_default()
                .to_owned(),
            user_url: user
                .and_then(|user| user.value().attr("href"))
                .unwrap_or_default()
                .to_owned(),
            text: self.body_text(node),
            num_likes: node
                .select(&self.likes)
                .next()
                .map(|likes| likes_from_phrase(&text_of(likes)))
                .unwrap_or(0),
            sort_order: self.sort_order.clone(),
            shelves,
            review_id,
        })
    }

    fn shelves(&self, node: ElementRef<'_>) -> Vec<ShelfTag> {
        let Some(shelves) = node.select(&self.shelves).next() else {
            return Vec::new();
        };
        shelves
            .select(&self.anchor)
            .filter_map(|link| {
                let href = link.value().attr("href")?;
                let shelf_id = self.shelf_id.find(href)?.as_str().to_owned();
                Some(ShelfTag {
                    name: text_of(link).trim().to_owned(),
                    shelf_id,
                })
            })
            .collect()
    }

    /// The site renders a truncated span and a hidden full-length span.
    fn body_text(&self, node: ElementRef<'_>) -> String {
        let Some(readable) = node.select(&self.readable).next() else {
            return String::new();
        };

        let mut display = String::new();
        let mut full = String::new();
        for child in readable.children().filter_map(ElementRef::wrap) {
            if child.value().name() != "span" {
                continue;
            }
            match child.value().attr("style") {
                None => display = text_of(child),
                Some(style) if style.replace(' ', "") == "display:none" => full = text_of(child),
                Some(_) => {}
            }
        }

        if full.trim().is_empty() {
            display.trim().to_owned()
        } else {
            full.trim().to_owned()
        }
    }
}

impl HarvestSource for ReviewExtractor {
    type Record = Review;

    fn target_url(&self, target_id: &str) -> String {
        self.site.book_url(target_id)
    }

    fn extract(&self, markup: &str, target_id: &str) -> Result<Vec<Review>, ExtractError> {
        let document = Html::parse_document(markup);
        let book_title = document
            .select(&self.book_title)
            .next()
            .map(|title| text_of(title).trim().to_owned())
            .unwrap_or_default();
        if book_title.is_empty() {
            tracing::debug!(book = target_id, "no #bookTitle on page");
        }

        Ok(document
            .select(&self.review)
            .filter_map(|node| self.parse_review(node, target_id, &book_title))
            .collect())
    }
}

/// Titles on a user's shelf page. Titles collapse: a shelf is a set.
pub struct ShelfExtractor {
    site: Site,
    row: Selector,
    title_cell: Selector,
    anchor: Selector,
}

impl ShelfExtractor {
    pub fn new(site: Site) -> Result<Self, ExtractError> {
        Ok(Self {
            site,
            row: selector("tr.review")?,
            title_cell: selector("td.title")?,
            anchor: selector("a")?,
        })
    }
}

impl HarvestSource for ShelfExtractor {
    type Record = ShelvedBook;

    fn target_url(&self, target_id: &str) -> String {
        self.site.shelf_url(target_id)
    }

    fn extract(&self, markup: &str, _target_id: &str) -> Result<Vec<ShelvedBook>, ExtractError> {
        let document = Html::parse_document(markup);
        let mut seen = HashSet::new();
        let mut books = Vec::new();

        for row in document.select(&self.row) {
            let title = row
                .select(&self.title_cell)
                .next()
                .and_then(|cell| cell.select(&self.anchor).next())
                .and_then(|link| link.value().attr("title"));
            let Some(title) = title else {
                continue;
            };
            if seen.insert(title.to_owned()) {
                books.push(ShelvedBook {
                    title: title.to_owned(),
                });
            }
        }

        Ok(books)
    }

    fn merge(&self, accumulated: &mut Vec<ShelvedBook>, page: Vec<ShelvedBook>) {
        let mut seen: HashSet<String> = accumulated.iter().map(|book| book.title.clone()).collect();
        for book in page {
            if seen.insert(book.title.clone()) {
                accumulated.push(book);
            }
        }
    }
}
