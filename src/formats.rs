use serde::{Deserialize, Serialize};

pub trait HarvestRecord {
    fn dedup_key(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShelfTag {
    pub name: String,
    pub shelf_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub book_id_title: String,
    pub book_id: String,
    pub book_title: String,
    pub review_url: String,
    pub review_id: String,
    pub date: String,
    pub rating: Option<u8>,
    pub user_name: String,
    pub user_url: String,
    #[serde(default)]
    pub text: String,
    pub num_likes: u32,
    pub sort_order: String,
    pub shelves: Vec<ShelfTag>,
}

impl HarvestRecord for Review {
    fn dedup_key(&self) -> &str {
        &self.review_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShelvedBook {
    pub title: String,
}

impl HarvestRecord for ShelvedBook {
    fn dedup_key(&self) -> &str {
        &self.title
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoriteShelves {
    pub book_id: String,
    pub shelf_ids: Vec<String>,
}
