use serde::{Deserialize, Serialize};

/// A profile / tweet category offered by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    pub key: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
    pub keywords: &'static [&'static str],
}

pub const CATEGORIES: &[Category] = &[
    Category {
        key: "electrical",
        label: "Electrical",
        icon: "⚡️",
        keywords: &["quantum", "power"],
    },
    Category {
        key: "mechanical",
        label: "Mechanical",
        icon: "⚙️",
        keywords: &["project", "Upwork"],
    },
    Category {
        key: "farming",
        label: "Farming",
        icon: "🌾",
        keywords: &["farm", "farming"],
    },
    Category {
        key: "coding",
        label: "Coding",
        icon: "💻",
        keywords: &["processing", "certificate"],
    },
    Category {
        key: "fashion",
        label: "Fashion",
        icon: "👗",
        keywords: &["project", "design"],
    },
    Category {
        key: "construction",
        label: "Construction",
        icon: "🚧",
        keywords: &["build", "site"],
    },
];

impl Category {
    pub fn find(key: &str) -> Option<&'static Category> {
        CATEGORIES.iter().find(|c| c.key.eq_ignore_ascii_case(key))
    }
}

/// Badge shown next to a tweet, picked from the message text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Badge {
    Electrical,
    Fashion,
    Coding,
    Construction,
    Farming,
    Restaurant,
    Default,
}

impl Badge {
    /// First matching rule wins, in declaration order.
    const RULES: &'static [(Badge, &'static [&'static str])] = &[
        (Badge::Electrical, &["electrical", "electronics", "circuit"]),
        (Badge::Fashion, &["fashion"]),
        (Badge::Coding, &["coding", "aptech"]),
        (Badge::Construction, &["construction", "site", "stone", "bricks"]),
        (Badge::Farming, &["farm", "agriculture", "crop"]),
        (
            Badge::Restaurant,
            &["restaurant", "chef", "resturant", "food", "restuarant"],
        ),
    ];

    pub fn for_message(message: &str) -> Self {
        let msg = message.to_lowercase();
        Self::RULES
            .iter()
            .find(|(_, words)| words.iter().any(|w| msg.contains(w)))
            .map(|(badge, _)| *badge)
            .unwrap_or(Badge::Default)
    }

    pub fn image_path(&self) -> &'static str {
        match self {
            Self::Electrical => "/badges/badge_electrical_sdxl.jpg",
            Self::Fashion => "/badges/badge_fashion_sdxl.jpg",
            Self::Coding => "/badges/badge_coding_sdxl.jpg",
            Self::Construction => "/badges/badge_construction_sdxl.jpg",
            Self::Farming => "/badges/badge_farming_sdxl.jpg",
            Self::Restaurant => "/badges/badge_restaurant_sdxl.jpg",
            Self::Default => "/badges/default.png",
        }
    }
}
