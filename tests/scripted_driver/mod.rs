#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use serde_json::Value;
use shelfscout::driver::{BrowserDriver, DriverError};

pub const NEXT_SELECTOR: &str = "a.next_page";

/// In-memory stand-in for a browser tab.
///
/// Each registered URL owns an ordered list of page markups. Paged sites move
/// when a "next" or page-number link is clicked; scrolling sites move when
/// scrolled to the bottom.
#[derive(Debug, Default)]
pub struct ScriptedDriver {
    sites: HashMap<String, Vec<String>>,
    scrolling: HashSet<String>,
    click_failures: HashMap<(String, u32), VecDeque<DriverError>>,
    read_failures: HashMap<String, VecDeque<DriverError>>,
    stalled_clicks: HashMap<(String, u32), u32>,
    missing_next: HashSet<(String, u32)>,
    current_url: Option<String>,
    current_page: u32,
    pub navigations: Vec<String>,
    pub extractions: usize,
    pub finds: Vec<String>,
    pub clicks: usize,
}

#[derive(Debug)]
pub struct ScriptedElement {
    target_page: u32,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pages(mut self, url: &str, pages: Vec<String>) -> Self {
        self.sites.insert(url.to_owned(), pages);
        self
    }

    pub fn with_scroll_pages(mut self, url: &str, pages: Vec<String>) -> Self {
        self.scrolling.insert(url.to_owned());
        self.with_pages(url, pages)
    }

    /// The next click that targets `page` on `url` fails with `err`.
    pub fn fail_click(mut self, url: &str, page: u32, err: DriverError) -> Self {
        self.click_failures
            .entry((url.to_owned(), page))
            .or_default()
            .push_back(err);
        self
    }

    /// The next read of the rendered markup on `url` fails with `err`.
    pub fn fail_read(mut self, url: &str, err: DriverError) -> Self {
        self.read_failures
            .entry(url.to_owned())
            .or_default()
            .push_back(err);
        self
    }

    /// The next click that targets `page` reports success but leaves the tab where it was.
    pub fn stall_click(mut self, url: &str, page: u32) -> Self {
        *self
            .stalled_clicks
            .entry((url.to_owned(), page))
            .or_default() += 1;
        self
    }

    /// While `page` is on screen the "next" link is not rendered.
    pub fn hide_next_on(mut self, url: &str, page: u32) -> Self {
        self.missing_next.insert((url.to_owned(), page));
        self
    }

    pub fn navigations_to(&self, url: &str) -> usize {
        self.navigations.iter().filter(|nav| *nav == url).count()
    }

    fn url(&self) -> Result<&str, DriverError> {
        self.current_url
            .as_deref()
            .ok_or_else(|| DriverError::Unclassified("no page loaded".to_owned()))
    }

    fn page_count(&self) -> Result<u32, DriverError> {
        let url = self.url()?;
        let pages = self
            .sites
            .get(url)
            .ok_or_else(|| DriverError::Unclassified(format!("unknown url {url}")))?;
        Ok(pages.len() as u32)
    }
}

fn requested_page(selector: &str) -> Option<u32> {
    let rest = &selector[selector.find("page=")? + "page=".len()..];
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

#[async_trait]
impl BrowserDriver for ScriptedDriver {
    type Element = ScriptedElement;

    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.navigations.push(url.to_owned());
        if !self.sites.contains_key(url) {
            return Err(DriverError::Unclassified(format!("net::ERR_NAME_NOT_RESOLVED {url}")));
        }
        self.current_url = Some(url.to_owned());
        self.current_page = 1;
        Ok(())
    }

    async fn current_markup(&mut self) -> Result<String, DriverError> {
        self.extractions += 1;
        let url = self.url()?.to_owned();
        if let Some(err) = self
            .read_failures
            .get_mut(&url)
            .and_then(|queue| queue.pop_front())
        {
            return Err(err);
        }
        let index = self.current_page.saturating_sub(1) as usize;
        self.sites
            .get(&url)
            .and_then(|pages| pages.get(index))
            .cloned()
            .ok_or_else(|| DriverError::Unclassified(format!("no page {index} for {url}")))
    }

    async fn find(&mut self, selector: &str) -> Result<ScriptedElement, DriverError> {
        self.finds.push(selector.to_owned());
        let url = self.url()?.to_owned();
        let total = self.page_count()?;

        if selector == NEXT_SELECTOR {
            let hidden = self.missing_next.contains(&(url, self.current_page));
            if self.current_page < total && !hidden {
                return Ok(ScriptedElement {
                    target_page: self.current_page + 1,
                });
            }
            return Err(DriverError::not_found(selector));
        }

        match requested_page(selector) {
            Some(page) if page >= 1 && page <= total => Ok(ScriptedElement { target_page: page }),
            _ => Err(DriverError::not_found(selector)),
        }
    }

    async fn click(&mut self, element: &ScriptedElement) -> Result<(), DriverError> {
        self.clicks += 1;
        let key = (self.url()?.to_owned(), element.target_page);

        if let Some(err) = self
            .click_failures
            .get_mut(&key)
            .and_then(|queue| queue.pop_front())
        {
            return Err(err);
        }
        if let Some(stalls) = self.stalled_clicks.get_mut(&key) {
            if *stalls > 0 {
                *stalls -= 1;
                return Ok(());
            }
        }

        self.current_page = element.target_page;
        Ok(())
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), DriverError> {
        let url = self.url()?.to_owned();
        if self.scrolling.contains(&url) && self.current_page < self.page_count()? {
            self.current_page += 1;
        }
        Ok(())
    }

    async fn execute_script(&mut self, script: &str) -> Result<Value, DriverError> {
        if script.contains("scrollHeight") {
            return Ok(Value::from(self.current_page * 1000));
        }
        Ok(Value::Null)
    }
}

pub fn review_node(id: &str, shelves: &[(&str, &str)]) -> String {
    let shelf_links: String = shelves
        .iter()
        .map(|(name, shelf_id)| format!(r#"<a href="/review/list/{shelf_id}">{name}</a> "#))
        .collect();
    let shelves_div = if shelves.is_empty() {
        String::new()
    } else {
        format!(r#"<div class="uitext greyText bookshelves">Shelves: {shelf_links}</div>"#)
    };
    format!(
        r#"<div class="review" id="review_{id}">
  <a class="user" title="user {id}" href="/user/show/{id}">user {id}</a>
  <a class="reviewDate createdAt right" href="/review/show/{id}">Jan 01, 2021</a>
  <span class="staticStars" title="really liked it"></span>
  {shelves_div}
  <span class="readable"><span>review {id}</span></span>
  <span class="likesCount">3 likes</span>
</div>"#
    )
}

pub fn book_page(title: &str, nodes: &[String]) -> String {
    format!(
        r#"<!doctype html>
<html><body>
<h1 id="bookTitle">{title}</h1>
{}
<div class="uitext"><a class="next_page" href="?page=2">next »</a></div>
</body></html>"#,
        nodes.join("\n")
    )
}

/// A page of `count` reviews, each on the reader's "to-read" shelf.
pub fn numbered_review_page(page: u32, count: u32) -> String {
    let nodes: Vec<String> = (0..count)
        .map(|n| review_node(&format!("{page}{n:03}"), &[("to-read", "1-reader?shelf=to-read")]))
        .collect();
    book_page("Numbered", &nodes)
}

pub fn shelf_page(titles: &[&str]) -> String {
    let rows: String = titles
        .iter()
        .map(|title| {
            format!(
                r#"<tr class="review"><td class="title"><a title="{title}" href="/book/show/x">{title}</a></td></tr>"#
            )
        })
        .collect();
    format!("<!doctype html><html><body><table>{rows}</table></body></html>")
}
