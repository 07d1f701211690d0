//! Built-in catalogs shipped with the app. Used on first run and whenever the
//! backend returns no rows for a table.

use chrono::{TimeZone, Utc};

use crate::model::*;

fn s(v: &str) -> String {
    v.to_string()
}

fn steps(items: &[&str]) -> Vec<String> {
    items.iter().map(|i| i.to_string()).collect()
}

pub fn catalog() -> Catalog {
    Catalog {
        actions: eco_actions(),
        tips: eco_tips(),
        challenges: challenges(),
    }
}

pub fn eco_actions() -> Vec<EcoAction> {
    vec![
        EcoAction {
            id: s("1"),
            title: s("Switch to LED Bulbs"),
            description: s(
                "Replace your traditional incandescent bulbs with energy-efficient LED bulbs.",
            ),
            impact: Impact {
                carbon: 0.3,
                water: 0.0,
                waste: 0.0,
                energy: 75.0,
            },
            difficulty: Difficulty::Easy,
            category: ActionCategory::Energy,
            image_url: Some(s(
                "https://images.pexels.com/photos/3049372/pexels-photo-3049372.jpeg",
            )),
        },
        EcoAction {
            id: s("2"),
            title: s("Use Reusable Shopping Bags"),
            description: s("Switch to reusable shopping bags instead of single-use plastic bags."),
            impact: Impact {
                carbon: 0.1,
                water: 0.0,
                waste: 0.5,
                energy: 10.0,
            },
            difficulty: Difficulty::Easy,
            category: ActionCategory::Shopping,
            image_url: Some(s(
                "https://images.pexels.com/photos/5624999/pexels-photo-5624999.jpeg",
            )),
        },
        EcoAction {
            id: s("3"),
            title: s("Take Shorter Showers"),
            description: s("Reduce your shower time by 2 minutes to save water and energy."),
            impact: Impact {
                carbon: 0.2,
                water: 40.0,
                waste: 0.0,
                energy: 25.0,
            },
            difficulty: Difficulty::Medium,
            category: ActionCategory::Home,
            image_url: Some(s(
                "https://images.pexels.com/photos/7587620/pexels-photo-7587620.jpeg",
            )),
        },
        EcoAction {
            id: s("4"),
            title: s("Eat Less Meat"),
            description: s("Reduce meat consumption by having one vegetarian day per week."),
            impact: Impact {
                carbon: 0.8,
                water: 15.0,
                waste: 0.1,
                energy: 5.0,
            },
            difficulty: Difficulty::Medium,
            category: ActionCategory::Food,
            image_url: Some(s(
                "https://images.pexels.com/photos/1414651/pexels-photo-1414651.jpeg",
            )),
        },
        EcoAction {
            id: s("5"),
            title: s("Bike to Work"),
            description: s("Use a bicycle for commuting instead of driving when possible."),
            impact: Impact {
                carbon: 1.5,
                water: 0.0,
                waste: 0.0,
                energy: 100.0,
            },
            difficulty: Difficulty::Hard,
            category: ActionCategory::Transport,
            image_url: Some(s(
                "https://images.pexels.com/photos/3370159/pexels-photo-3370159.jpeg",
            )),
        },
        EcoAction {
            id: s("6"),
            title: s("Install a Low-Flow Showerhead"),
            description: s(
                "Replace your current showerhead with a low-flow version to save water.",
            ),
            impact: Impact {
                carbon: 0.3,
                water: 60.0,
                waste: 0.0,
                energy: 30.0,
            },
            difficulty: Difficulty::Easy,
            category: ActionCategory::Home,
            image_url: Some(s(
                "https://images.pexels.com/photos/1625884/pexels-photo-1625884.jpeg",
            )),
        },
    ]
}

pub fn eco_tips() -> Vec<EcoTip> {
    let tip = |id: &str, title: &str, content: &str, category: &str, source: &str| EcoTip {
        id: s(id),
        title: s(title),
        content: s(content),
        category: s(category),
        source: Some(s(source)),
    };

    vec![
        tip(
            "1",
            "Unplug Electronics When Not in Use",
            "Many electronics use power even when turned off. Unplug them to save energy.",
            "energy",
            "Energy Saving Trust",
        ),
        tip(
            "2",
            "Use Cold Water for Laundry",
            "Washing clothes in cold water saves energy and can be just as effective.",
            "home",
            "EPA",
        ),
        tip(
            "3",
            "Bring Your Own Container",
            "Bring reusable containers to restaurants for leftovers to reduce waste.",
            "food",
            "Zero Waste Alliance",
        ),
        tip(
            "4",
            "Fix Leaky Faucets",
            "A dripping faucet can waste up to 3,000 gallons of water per year.",
            "home",
            "Water.org",
        ),
        tip(
            "5",
            "Plant Native Species",
            "Native plants require less water and maintenance than non-native species.",
            "gardening",
            "National Wildlife Federation",
        ),
    ]
}

pub fn challenges() -> Vec<Challenge> {
    vec![
        Challenge {
            id: s("1"),
            title: s("Plastic-Free Week"),
            description: s("Avoid single-use plastics for one week."),
            duration: 7,
            points: 50,
            category: s("waste"),
            steps: steps(&[
                "Replace plastic water bottles with a reusable bottle",
                "Use cloth bags for shopping",
                "Avoid products with plastic packaging",
                "Use bamboo toothbrush instead of plastic",
                "Choose cardboard or glass packaging over plastic",
            ]),
            progress: None,
            image_url: Some(s(
                "https://images.pexels.com/photos/802221/pexels-photo-802221.jpeg",
            )),
        },
        Challenge {
            id: s("2"),
            title: s("Meatless Monday"),
            description: s("Eat vegetarian meals every Monday for a month."),
            duration: 30,
            points: 40,
            category: s("food"),
            steps: steps(&[
                "Plan vegetarian meals in advance",
                "Try new plant-based protein sources",
                "Share vegetarian recipes with friends",
                "Track your carbon footprint reduction",
            ]),
            progress: None,
            image_url: Some(s(
                "https://images.pexels.com/photos/1640774/pexels-photo-1640774.jpeg",
            )),
        },
        Challenge {
            id: s("3"),
            title: s("Home Energy Audit"),
            description: s("Identify and fix energy waste in your home."),
            duration: 14,
            points: 60,
            category: s("energy"),
            steps: steps(&[
                "Check for air leaks around doors and windows",
                "Inspect insulation in attic and walls",
                "Evaluate lighting efficiency",
                "Check appliance energy usage",
                "Make a list of improvements to implement",
            ]),
            progress: None,
            image_url: Some(s(
                "https://images.pexels.com/photos/3825586/pexels-photo-3825586.jpeg",
            )),
        },
        Challenge {
            id: s("4"),
            title: s("Zero-Waste Shopping"),
            description: s("Practice zero-waste shopping habits for two weeks."),
            duration: 14,
            points: 45,
            category: s("shopping"),
            steps: steps(&[
                "Bring reusable bags and containers",
                "Shop at farmers markets or bulk stores",
                "Avoid packaged products",
                "Make a shopping list to prevent food waste",
                "Choose products with minimal or recyclable packaging",
            ]),
            progress: None,
            image_url: Some(s(
                "https://images.pexels.com/photos/8091469/pexels-photo-8091469.jpeg",
            )),
        },
    ]
}

pub fn resources() -> Vec<Resource> {
    vec![
        Resource {
            id: s("1"),
            title: s("Understanding Carbon Footprint"),
            description: s("A comprehensive guide to understanding and calculating your carbon footprint, with practical tips for reduction."),
            kind: ResourceKind::Article,
            category: s("climate"),
            url: s("#"),
            image_url: Some(s("https://images.pexels.com/photos/2990650/pexels-photo-2990650.jpeg")),
        },
        Resource {
            id: s("2"),
            title: s("Zero Waste Living: Beginner's Guide"),
            description: s("Learn the basics of zero waste living and how to implement sustainable practices in your daily life."),
            kind: ResourceKind::Guide,
            category: s("lifestyle"),
            url: s("#"),
            image_url: Some(s("https://images.pexels.com/photos/5725001/pexels-photo-5725001.jpeg")),
        },
        Resource {
            id: s("3"),
            title: s("Sustainable Energy Solutions"),
            description: s("Explore different renewable energy options and their impact on environmental conservation."),
            kind: ResourceKind::Video,
            category: s("energy"),
            url: s("#"),
            image_url: Some(s("https://images.pexels.com/photos/356036/pexels-photo-356036.jpeg")),
        },
        Resource {
            id: s("4"),
            title: s("Composting 101"),
            description: s("A step-by-step guide to starting and maintaining a successful composting system at home."),
            kind: ResourceKind::Infographic,
            category: s("waste"),
            url: s("#"),
            image_url: Some(s("https://images.pexels.com/photos/4503751/pexels-photo-4503751.jpeg")),
        },
    ]
}

pub fn local_services() -> Vec<LocalService> {
    let service = |id: &str,
                   name: &str,
                   category: &str,
                   description: &str,
                   address: &str,
                   lat: f64,
                   lng: f64,
                   rating: f32,
                   phone: &str| LocalService {
        id: s(id),
        name: s(name),
        category: s(category),
        description: s(description),
        address: s(address),
        coordinates: Coordinates { lat, lng },
        rating,
        website: Some(s("https://example.com")),
        phone: Some(s(phone)),
    };

    vec![
        service(
            "1",
            "Green Market Co-op",
            "grocery",
            "Local organic grocery store offering package-free shopping and locally sourced produce.",
            "123 Eco Street, Green City",
            40.7128,
            -74.0060,
            4.8,
            "+1 234-567-8900",
        ),
        service(
            "2",
            "Sustainable Solutions",
            "home",
            "Professional energy auditing and solar panel installation services.",
            "456 Solar Avenue, Green City",
            40.7129,
            -74.0061,
            4.6,
            "+1 234-567-8901",
        ),
        service(
            "3",
            "EcoCycle Center",
            "recycling",
            "Comprehensive recycling center accepting electronics, hazardous waste, and hard-to-recycle items.",
            "789 Recycle Road, Green City",
            40.7130,
            -74.0062,
            4.7,
            "+1 234-567-8902",
        ),
        service(
            "4",
            "Green Transport Rentals",
            "transport",
            "Electric vehicle and bicycle rentals for eco-friendly transportation.",
            "321 Mobile Street, Green City",
            40.7131,
            -74.0063,
            4.5,
            "+1 234-567-8903",
        ),
    ]
}

pub fn community_posts() -> Vec<CommunityPost> {
    let at = |y, mo, d, h, mi| {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0)
            .single()
            .unwrap_or_else(Utc::now)
    };
    let tags = |t: &[&str]| t.iter().map(|x| x.to_string()).collect::<Vec<_>>();

    vec![
        CommunityPost {
            id: s("1"),
            user_id: s("user1"),
            user_name: s("Sarah Green"),
            user_avatar: Some(s("https://images.pexels.com/photos/415829/pexels-photo-415829.jpeg")),
            title: s("My Zero Waste Journey: Week 1"),
            content: s("Started my zero waste journey this week! Switched to reusable bags, containers, and a bamboo toothbrush. Small steps, but feeling good about making a difference."),
            likes: 24,
            comments: 8,
            tags: tags(&["zerowaste", "sustainable", "ecofriendly"]),
            created_at: at(2024, 3, 10, 10, 0),
        },
        CommunityPost {
            id: s("2"),
            user_id: s("user2"),
            user_name: s("Mike Rivers"),
            user_avatar: Some(s("https://images.pexels.com/photos/220453/pexels-photo-220453.jpeg")),
            title: s("Home Solar Panel Installation Success!"),
            content: s("Finally got solar panels installed on my roof! The process was surprisingly smooth, and I'm already seeing a difference in my energy bills. Happy to answer any questions!"),
            likes: 42,
            comments: 15,
            tags: tags(&["solarenergy", "renewable", "sustainability"]),
            created_at: at(2024, 3, 9, 14, 30),
        },
        CommunityPost {
            id: s("3"),
            user_id: s("user3"),
            user_name: s("Emma Woods"),
            user_avatar: Some(s("https://images.pexels.com/photos/774909/pexels-photo-774909.jpeg")),
            title: s("Community Garden Project Update"),
            content: s("Our neighborhood community garden is thriving! We've grown over 100 lbs of organic vegetables this season. Swipe to see our latest harvest! 🌱"),
            likes: 35,
            comments: 12,
            tags: tags(&["communitygarden", "organic", "localfood"]),
            created_at: at(2024, 3, 8, 9, 15),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_seed_sizes() {
        assert_eq!(eco_actions().len(), 6);
        assert_eq!(eco_tips().len(), 5);
        assert_eq!(challenges().len(), 4);
        assert_eq!(resources().len(), 4);
        assert_eq!(local_services().len(), 4);
        assert_eq!(community_posts().len(), 3);
    }

    #[test]
    fn test_seed_ids_unique() {
        let ids: HashSet<_> = challenges().into_iter().map(|c| c.id).collect();
        assert_eq!(ids.len(), 4);
        let ids: HashSet<_> = eco_actions().into_iter().map(|a| a.id).collect();
        assert_eq!(ids.len(), 6);
    }

    #[test]
    fn test_catalog_challenges_not_joined() {
        assert!(catalog().challenges.iter().all(|c| c.progress.is_none()));
    }

    #[test]
    fn test_meatless_monday() {
        let c = catalog();
        let meatless = c.challenge("2").unwrap();
        assert_eq!(meatless.title, "Meatless Monday");
        assert_eq!(meatless.duration, 30);
        assert_eq!(meatless.points, 40);
    }

    #[test]
    fn test_community_posts_newest_first() {
        let posts = community_posts();
        assert!(posts
            .windows(2)
            .all(|w| w[0].created_at >= w[1].created_at));
    }
}
