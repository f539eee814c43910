//! Sample financial datasets.
//!
//! Baseline records a personal-finance app ships with, used as collection
//! defaults and as seeding input in tests and demos.

use serde_json::{json, Value};

use ledgerline::CollectionSpec;
use ledgerline_core::Record;

use crate::fixtures::collection_name;

fn from_json(value: Value) -> Record {
    Record::from_value(value).unwrap_or_else(|e| panic!("bad sample record: {}", e))
}

fn category(id: &str, name: &str, icon: &str, kind: &str, color: &str) -> Record {
    from_json(json!({ "id": id, "name": name, "icon": icon, "type": kind, "color": color }))
}

/// Default categories. Expenses use ids `c1..`, income `c50..`.
pub fn initial_categories() -> Vec<Record> {
    vec![
        category("c1", "Food", "Utensils", "expense", "text-orange-400"),
        category("c2", "Groceries", "ShoppingCart", "expense", "text-amber-400"),
        category("c3", "Restaurants", "Coffee", "expense", "text-orange-400"),
        category("c4", "Housing", "Home", "expense", "text-rose-400"),
        category("c5", "Rent", "Building2", "expense", "text-rose-400"),
        category("c6", "Electricity", "Zap", "expense", "text-yellow-400"),
        category("c7", "Water", "Droplets", "expense", "text-blue-400"),
        category("c8", "Internet", "Wifi", "expense", "text-cyan-400"),
        category("c10", "Transport", "Car", "expense", "text-blue-400"),
        category("c11", "Fuel", "Fuel", "expense", "text-amber-400"),
        category("c13", "Health", "HeartPulse", "expense", "text-red-400"),
        category("c16", "Education", "GraduationCap", "expense", "text-indigo-400"),
        category("c18", "Leisure", "Smile", "expense", "text-purple-400"),
        category("c19", "Streaming", "Tv", "expense", "text-red-400"),
        category("c25", "Subscriptions", "CreditCard", "expense", "text-violet-400"),
        category("c26", "Taxes", "Receipt", "expense", "text-slate-400"),
        category("c28", "Other", "MoreHorizontal", "expense", "text-slate-400"),
        category("c50", "Salary", "Briefcase", "income", "text-emerald-400"),
        category("c51", "Freelance", "Laptop", "income", "text-blue-400"),
        category("c56", "Investments", "LineChart", "income", "text-violet-400"),
        category("c57", "Dividends", "PiggyBank", "income", "text-pink-400"),
        category("c61", "Refunds", "RefreshCcw", "income", "text-blue-400"),
        category("c63", "Other income", "MoreHorizontal", "income", "text-slate-400"),
    ]
}

pub fn initial_accounts() -> Vec<Record> {
    vec![
        from_json(json!({ "id": "a1", "name": "Wallet", "type": "account", "balance": 500.0, "bank": "Cash" })),
        from_json(json!({ "id": "a2", "name": "Checking", "type": "account", "balance": 2500.0, "bank": "Nubank" })),
        from_json(json!({
            "id": "a3", "name": "Credit card", "type": "card",
            "balance": 0, "limit": 8000, "due_day": 10, "bank": "Nubank"
        })),
    ]
}

pub fn initial_goals() -> Vec<Record> {
    vec![from_json(json!({
        "id": "g1", "name": "Emergency fund",
        "target_amount": 10000, "current_amount": 0, "icon": "ShieldCheck"
    }))]
}

/// Every collection of the finance app. Only categories are seeded.
pub fn financial_collections() -> Vec<CollectionSpec> {
    let plain = |name: &str| CollectionSpec::new(collection_name(name));
    vec![
        plain("transactions"),
        plain("categories").with_defaults(initial_categories()).seeded(),
        plain("accounts").with_defaults(initial_accounts()),
        plain("goals").with_defaults(initial_goals()),
        plain("shopping_items"),
        plain("scheduled_transactions"),
        plain("tags"),
        plain("budgets"),
        plain("transfers"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_category_ids_and_names_unique() {
        let categories = initial_categories();
        let ids: HashSet<_> = categories.iter().map(|c| c.id.clone()).collect();
        let names: HashSet<_> = categories.iter().filter_map(|c| c.name()).collect();
        assert_eq!(ids.len(), categories.len());
        assert_eq!(names.len(), categories.len());
    }

    #[test]
    fn test_only_categories_are_seeded() {
        let seeded: Vec<_> = financial_collections()
            .into_iter()
            .filter(|spec| spec.seed)
            .map(|spec| spec.name.to_string())
            .collect();
        assert_eq!(seeded, vec!["categories"]);
    }
}
