//! Inputs to feed mutations and admin endpoints

use serde::Deserialize;

use crate::models::{Post, UserProfile, Visibility};

/// New account data.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub name: String,
}

/// New post data.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPost {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub visibility: Visibility,
}

/// Partial post edit. Absent fields stay unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostUpdate {
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub visibility: Option<Visibility>,
}

impl PostUpdate {
    /// Copies every present field onto `post`.
    pub fn apply_to(&self, post: &mut Post) {
        if let Some(content) = &self.content {
            post.content = content.clone();
        }
        if let Some(tags) = &self.tags {
            post.tags = tags.clone();
        }
        if let Some(visibility) = self.visibility {
            post.visibility = visibility;
        }
    }
}

/// Partial profile edit. Absent fields stay unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub about: Option<String>,
    pub location: Option<String>,
    pub link: Option<String>,
    pub avatar: Option<String>,
    pub cover_img: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.about.is_none()
            && self.location.is_none()
            && self.link.is_none()
            && self.avatar.is_none()
            && self.cover_img.is_none()
    }

    /// Copies every present field onto `user`.
    pub fn apply_to(&self, user: &mut UserProfile) {
        let fields = [
            (&self.name, &mut user.name),
            (&self.about, &mut user.about),
            (&self.location, &mut user.location),
            (&self.link, &mut user.link),
            (&self.avatar, &mut user.avatar),
            (&self.cover_img, &mut user.cover_img),
        ];
        for (update, field) in fields {
            if let Some(value) = update {
                *field = value.clone();
            }
        }
    }
}

/// Query for `DELETE /cache`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlushQuery {
    /// Only remove keys under this prefix
    pub prefix: Option<String>,
}
