use std::collections::{BTreeMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tabsplit_core::{price_in_range, round_money, Item, ItemId, MAX_PRICE_DIGITS};

use crate::error::SplitError;
use crate::policy::{validate_rate, TipBase};
use crate::summary::{summarize_items, BillReport, PersonSummary};

/// Someone paying for a share of the bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    name: String,
    tax_rate: Decimal,
    tip_rate: Decimal,
    items: Vec<ItemId>,
}

impl Person {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }

    pub fn tip_rate(&self) -> Decimal {
        self.tip_rate
    }

    /// Owned item ids, in assignment order.
    pub fn items(&self) -> &[ItemId] {
        &self.items
    }
}

/// What `replace_pool` had to undo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    /// Assignments whose item no longer exists.
    pub dropped_items: Vec<ItemId>,
    /// People left with nothing.
    pub removed_people: Vec<String>,
}

impl Reconciliation {
    pub fn is_noop(&self) -> bool {
        self.dropped_items.is_empty() && self.removed_people.is_empty()
    }
}

/// Manual correction of a parsed item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemEdit {
    pub description: Option<String>,
    pub price: Option<Decimal>,
}

/// One bill-splitting session: the item pool, the people, and who owns what.
///
/// Every item is either owned by exactly one person or unassigned.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    items: Vec<Item>,
    people: Vec<Person>,
    /// item id → owner name.
    owners: BTreeMap<ItemId, String>,
    #[serde(default)]
    tip_base: TipBase,
    #[serde(default)]
    generation: u64,
}

impl SessionState {
    pub fn new(tip_base: TipBase) -> Self {
        Self {
            tip_base,
            ..Self::default()
        }
    }

    pub fn with_items(items: Vec<Item>, tip_base: TipBase) -> Self {
        let mut state = Self::new(tip_base);
        state.replace_pool(items);
        state
    }

    pub fn tip_base(&self) -> TipBase {
        self.tip_base
    }

    pub fn set_tip_base(&mut self, tip_base: TipBase) {
        self.tip_base = tip_base;
    }

    /// Incremented on every `replace_pool`.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn people(&self) -> &[Person] {
        &self.people
    }

    pub fn person(&self, name: &str) -> Option<&Person> {
        let name = name.trim();
        self.people.iter().find(|p| p.name == name)
    }

    pub fn owner_of(&self, id: ItemId) -> Option<&str> {
        self.owners.get(&id).map(String::as_str)
    }

    /// Pool items nobody owns, in pool order.
    pub fn unassigned(&self) -> Vec<&Item> {
        self.items
            .iter()
            .filter(|i| !self.owners.contains_key(&i.id))
            .collect()
    }

    /// Resolve a full id or a unique id prefix against the current pool.
    pub fn resolve_item(&self, reference: &str) -> Result<ItemId, SplitError> {
        let reference = reference.trim();
        if let Ok(id) = reference.parse::<ItemId>() {
            if self.item(id).is_some() {
                return Ok(id);
            }
            return Err(SplitError::UnknownItem(reference.to_string()));
        }
        let matches: Vec<ItemId> = self
            .items
            .iter()
            .filter(|i| i.id.matches_prefix(reference))
            .map(|i| i.id)
            .collect();
        match matches.as_slice() {
            [id] => Ok(*id),
            [] => Err(SplitError::UnknownItem(reference.to_string())),
            many => Err(SplitError::AmbiguousItem {
                reference: reference.to_string(),
                matches: many.len(),
            }),
        }
    }

    /// Give `item_ids` to `name`, creating the person if needed. The person's
    /// rates are overwritten with the ones given here.
    ///
    /// All-or-nothing: on error the session is unchanged.
    pub fn assign(
        &mut self,
        name: &str,
        item_ids: &[ItemId],
        tax_rate: Decimal,
        tip_rate: Decimal,
    ) -> Result<(), SplitError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SplitError::InvalidAssignment("enter a name".into()));
        }
        if item_ids.is_empty() {
            return Err(SplitError::InvalidAssignment("select at least one item".into()));
        }
        let tax_rate = validate_rate("tax", tax_rate)?;
        let tip_rate = validate_rate("tip", tip_rate)?;

        let mut seen = HashSet::new();
        let mut selected = Vec::with_capacity(item_ids.len());
        for id in item_ids {
            if !seen.insert(*id) {
                continue;
            }
            if self.item(*id).is_none() {
                return Err(SplitError::UnknownItem(id.to_string()));
            }
            if let Some(owner) = self.owners.get(id) {
                return Err(SplitError::ItemAlreadyAssigned {
                    item: *id,
                    owner: owner.clone(),
                });
            }
            selected.push(*id);
        }

        let idx = match self.people.iter().position(|p| p.name == name) {
            Some(idx) => idx,
            None => {
                self.people.push(Person {
                    name: name.to_string(),
                    tax_rate,
                    tip_rate,
                    items: Vec::new(),
                });
                self.people.len() - 1
            }
        };
        let person = &mut self.people[idx];
        person.tax_rate = tax_rate;
        person.tip_rate = tip_rate;
        for id in &selected {
            person.items.push(*id);
            self.owners.insert(*id, name.to_string());
        }
        log::debug!("assigned {} item(s) to {name}", selected.len());
        Ok(())
    }

    /// Return `item_id` to the pool. A person left with no items is removed.
    /// Returns false (and changes nothing) if `name` does not own the item.
    pub fn unassign(&mut self, name: &str, item_id: ItemId) -> bool {
        let name = name.trim();
        if self.owners.get(&item_id).map(String::as_str) != Some(name) {
            return false;
        }
        let Some(idx) = self.people.iter().position(|p| p.name == name) else {
            return false;
        };
        self.owners.remove(&item_id);
        self.people[idx].items.retain(|id| *id != item_id);
        if self.people[idx].items.is_empty() {
            log::debug!("{name} has no items left; removing");
            self.people.remove(idx);
        }
        true
    }

    pub fn summarize(&self, name: &str) -> Result<PersonSummary, SplitError> {
        let person = self
            .person(name)
            .ok_or_else(|| SplitError::UnknownPerson(name.trim().to_string()))?;
        Ok(self.summary_of(person))
    }

    /// Summaries for everyone, in the order people were added.
    pub fn summaries(&self) -> Vec<PersonSummary> {
        self.people.iter().map(|p| self.summary_of(p)).collect()
    }

    fn summary_of(&self, person: &Person) -> PersonSummary {
        let items = person
            .items
            .iter()
            .filter_map(|id| self.item(*id).cloned())
            .collect();
        summarize_items(&person.name, person.tax_rate, person.tip_rate, items, self.tip_base)
    }

    /// Swap in a freshly parsed pool and drop assignments to items that are
    /// gone. People left empty are removed.
    pub fn replace_pool(&mut self, items: Vec<Item>) -> Reconciliation {
        self.items = items;
        self.generation += 1;
        let rec = self.reconcile();
        if !rec.is_noop() {
            log::info!(
                "pool replaced: dropped {} assignment(s), removed {} person(s)",
                rec.dropped_items.len(),
                rec.removed_people.len()
            );
        }
        rec
    }

    /// Bring owners and people back in line with the pool. Also repairs a
    /// session loaded from disk.
    pub fn reconcile(&mut self) -> Reconciliation {
        let live: HashSet<ItemId> = self.items.iter().map(|i| i.id).collect();
        let mut rec = Reconciliation::default();
        let mut owners = BTreeMap::new();

        for person in &mut self.people {
            let mut kept = Vec::with_capacity(person.items.len());
            for id in person.items.drain(..) {
                if !live.contains(&id) {
                    rec.dropped_items.push(id);
                } else if owners.contains_key(&id) {
                    log::warn!("item {} owned twice; keeping first owner", id.short());
                } else {
                    owners.insert(id, person.name.clone());
                    kept.push(id);
                }
            }
            person.items = kept;
        }
        for id in self.owners.keys() {
            if !live.contains(id) && !rec.dropped_items.contains(id) {
                rec.dropped_items.push(*id);
            }
        }
        self.people.retain(|p| {
            if p.items.is_empty() {
                rec.removed_people.push(p.name.clone());
                false
            } else {
                true
            }
        });
        self.owners = owners;
        rec
    }

    /// Apply a manual correction. Ownership is unaffected.
    pub fn edit_item(&mut self, id: ItemId, edit: ItemEdit) -> Result<&Item, SplitError> {
        let description = match edit.description {
            Some(d) if d.trim().is_empty() => {
                return Err(SplitError::InvalidEdit("description must not be empty".into()))
            }
            Some(d) => Some(d.trim().to_string()),
            None => None,
        };
        let price = edit.price.map(round_money);
        if let Some(price) = price {
            if !price_in_range(price) {
                return Err(SplitError::InvalidEdit(format!(
                    "price {price} exceeds {MAX_PRICE_DIGITS} integer digits"
                )));
            }
        }
        let item = self
            .items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| SplitError::UnknownItem(id.to_string()))?;
        if let Some(description) = description {
            item.description = description;
        }
        if let Some(price) = price {
            item.price = price;
        }
        Ok(&*item)
    }

    pub fn report(&self) -> BillReport {
        let items_total: Decimal = self.items.iter().map(|i| i.price).sum();
        BillReport::build(
            self.summaries(),
            self.unassigned().into_iter().cloned().collect(),
            items_total,
            self.tip_base,
            self.generation,
        )
    }

    /// Check amounts that arrived without going through `Item::new` or
    /// `assign`, such as a hand-edited session file.
    pub fn check_amounts(&self) -> Result<(), String> {
        for item in &self.items {
            if !price_in_range(item.price) || !price_in_range(item.discount) {
                return Err(format!(
                    "item {} has an amount beyond {MAX_PRICE_DIGITS} integer digits",
                    item.id.short()
                ));
            }
        }
        for person in &self.people {
            validate_rate("tax", person.tax_rate).map_err(|e| format!("{}: {e}", person.name))?;
            validate_rate("tip", person.tip_rate).map_err(|e| format!("{}: {e}", person.name))?;
        }
        Ok(())
    }

    /// Check that people's items and the unassigned pool partition the pool.
    pub fn verify_partition(&self) -> Result<(), String> {
        let live: HashSet<ItemId> = self.items.iter().map(|i| i.id).collect();
        let mut owned = HashSet::new();
        for person in &self.people {
            if person.items.is_empty() {
                return Err(format!("{} has no items", person.name));
            }
            for id in &person.items {
                if !live.contains(id) {
                    return Err(format!("{} owns stale item {}", person.name, id.short()));
                }
                if !owned.insert(*id) {
                    return Err(format!("item {} owned twice", id.short()));
                }
                if self.owners.get(id) != Some(&person.name) {
                    return Err(format!("owner map disagrees for {}", id.short()));
                }
            }
        }
        if owned.len() != self.owners.len() {
            return Err("owner map has entries no person holds".into());
        }
        let unassigned = self.unassigned().len();
        if owned.len() + unassigned != self.items.len() {
            return Err("pool is not partitioned".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn item(desc: &str, price: &str) -> Item {
        Item::new(desc, d(price)).unwrap()
    }

    fn session(prices: &[(&str, &str)]) -> SessionState {
        SessionState::with_items(
            prices.iter().map(|(n, p)| item(n, p)).collect(),
            TipBase::TaxInclusive,
        )
    }

    fn ids(state: &SessionState) -> Vec<ItemId> {
        state.items().iter().map(|i| i.id).collect()
    }

    #[test]
    fn assign_creates_person_and_claims_items() {
        let mut s = session(&[("Burger", "10.00"), ("Fries", "5.00"), ("Soda", "2.00")]);
        let ids = ids(&s);
        s.assign("Ana", &ids[..2], d("8"), d("15")).unwrap();

        assert_eq!(s.people().len(), 1);
        assert_eq!(s.owner_of(ids[0]), Some("Ana"));
        assert_eq!(s.unassigned().len(), 1);
        let sum = s.summarize("Ana").unwrap();
        assert_eq!(sum.total, d("18.63"));
        s.verify_partition().unwrap();
    }

    #[test]
    fn assign_rejects_blank_name_and_empty_selection() {
        let mut s = session(&[("Burger", "10.00")]);
        let ids = ids(&s);
        assert!(matches!(
            s.assign("  ", &ids, d("8"), d("15")),
            Err(SplitError::InvalidAssignment(_))
        ));
        assert!(matches!(
            s.assign("Ana", &[], d("8"), d("15")),
            Err(SplitError::InvalidAssignment(_))
        ));
        assert!(s.people().is_empty());
        assert_eq!(s.unassigned().len(), 1);
    }

    #[test]
    fn assign_is_exclusive_and_all_or_nothing() {
        let mut s = session(&[("Burger", "10.00"), ("Fries", "5.00")]);
        let ids = ids(&s);
        s.assign("Ana", &ids[..1], d("8"), d("15")).unwrap();

        let err = s.assign("Bo", &[ids[1], ids[0]], d("8"), d("15")).unwrap_err();
        assert_eq!(
            err,
            SplitError::ItemAlreadyAssigned { item: ids[0], owner: "Ana".into() }
        );
        assert!(s.person("Bo").is_none());
        assert_eq!(s.owner_of(ids[1]), None);
        s.verify_partition().unwrap();
    }

    #[test]
    fn assign_rejects_stale_ids() {
        let mut s = session(&[("Burger", "10.00")]);
        let stale = ItemId::issue();
        assert!(matches!(
            s.assign("Ana", &[stale], d("8"), d("15")),
            Err(SplitError::UnknownItem(_))
        ));
    }

    #[test]
    fn reassigning_overwrites_rates() {
        let mut s = session(&[("Burger", "10.00"), ("Fries", "5.00")]);
        let ids = ids(&s);
        s.assign("Ana", &ids[..1], d("8"), d("15")).unwrap();
        s.assign(" Ana ", &ids[1..], d("10"), d("20")).unwrap();

        assert_eq!(s.people().len(), 1);
        let ana = s.person("Ana").unwrap();
        assert_eq!(ana.tax_rate(), d("10"));
        assert_eq!(ana.tip_rate(), d("20"));
        assert_eq!(ana.items(), &ids[..]);
    }

    #[test]
    fn duplicate_ids_in_one_call_collapse() {
        let mut s = session(&[("Burger", "10.00")]);
        let id = ids(&s)[0];
        s.assign("Ana", &[id, id], d("0"), d("0")).unwrap();
        assert_eq!(s.person("Ana").unwrap().items().len(), 1);
        s.verify_partition().unwrap();
    }

    #[test]
    fn unassign_returns_item_and_drops_empty_person() {
        let mut s = session(&[("Burger", "10.00"), ("Fries", "5.00")]);
        let ids = ids(&s);
        s.assign("Ana", &ids, d("8"), d("15")).unwrap();

        assert!(s.unassign("Ana", ids[0]));
        assert_eq!(s.summarize("Ana").unwrap().subtotal, d("5.00"));
        assert!(s.unassign("Ana", ids[1]));
        assert!(s.person("Ana").is_none());
        assert_eq!(s.unassigned().len(), 2);
        s.verify_partition().unwrap();
    }

    #[test]
    fn unassign_by_non_owner_is_noop() {
        let mut s = session(&[("Burger", "10.00")]);
        let id = ids(&s)[0];
        s.assign("Ana", &[id], d("8"), d("15")).unwrap();
        assert!(!s.unassign("Bo", id));
        assert!(!s.unassign("Ana", ItemId::issue()));
        assert_eq!(s.owner_of(id), Some("Ana"));
    }

    #[test]
    fn replace_pool_purges_stale_assignments() {
        let mut s = session(&[("Burger", "10.00"), ("Fries", "5.00")]);
        let ids = ids(&s);
        s.assign("Ana", &ids[..1], d("8"), d("15")).unwrap();
        s.assign("Bo", &ids[1..], d("8"), d("15")).unwrap();

        let kept = s.items()[1].clone();
        let rec = s.replace_pool(vec![kept, item("Pie", "6.00")]);

        assert_eq!(rec.dropped_items, vec![ids[0]]);
        assert_eq!(rec.removed_people, vec!["Ana".to_string()]);
        assert!(s.summarize("Ana").is_err());
        assert_eq!(s.summaries().len(), 1);
        assert_eq!(s.summarize("Bo").unwrap().subtotal, d("5.00"));
        assert_eq!(s.generation(), 2);
        s.verify_partition().unwrap();
    }

    #[test]
    fn edit_updates_summaries() {
        let mut s = session(&[("Burger", "10.00")]);
        let id = ids(&s)[0];
        s.assign("Ana", &[id], d("0"), d("0")).unwrap();
        s.edit_item(
            id,
            ItemEdit { description: Some("Cheeseburger".into()), price: Some(d("11.5")) },
        )
        .unwrap();
        let sum = s.summarize("Ana").unwrap();
        assert_eq!(sum.items[0].description, "Cheeseburger");
        assert_eq!(sum.total.to_string(), "11.50");
        assert_eq!(s.owner_of(id), Some("Ana"));
    }

    #[test]
    fn edit_rejects_blank_description() {
        let mut s = session(&[("Burger", "10.00")]);
        let id = ids(&s)[0];
        let err = s
            .edit_item(id, ItemEdit { description: Some(" ".into()), price: None })
            .unwrap_err();
        assert!(matches!(err, SplitError::InvalidEdit(_)));
        assert_eq!(s.items()[0].description, "Burger");
    }

    #[test]
    fn edit_rejects_oversized_price() {
        let mut s = session(&[("Burger", "10.00")]);
        let id = ids(&s)[0];
        s.assign("Ana", &[id], d("8"), d("18")).unwrap();
        let err = s
            .edit_item(
                id,
                ItemEdit {
                    description: Some("Yacht".into()),
                    price: Some(d("9999999999999999999999999999")),
                },
            )
            .unwrap_err();
        assert!(matches!(err, SplitError::InvalidEdit(_)));
        assert_eq!(s.items()[0].description, "Burger");
        assert_eq!(s.summarize("Ana").unwrap().subtotal, d("10.00"));
    }

    #[test]
    fn check_amounts_flags_hand_edited_prices_and_rates() {
        let mut s = session(&[("Burger", "10.00")]);
        let id = ids(&s)[0];
        s.assign("Ana", &[id], d("8"), d("18")).unwrap();
        s.check_amounts().unwrap();

        let mut json = serde_json::to_value(&s).unwrap();
        json["items"][0]["price"] = "50000000000000000000000000000".into();
        let loaded: SessionState = serde_json::from_value(json).unwrap();
        assert!(loaded.check_amounts().is_err());

        let mut json = serde_json::to_value(&s).unwrap();
        json["people"][0]["tip_rate"] = "250".into();
        let loaded: SessionState = serde_json::from_value(json).unwrap();
        assert!(loaded.check_amounts().is_err());
    }

    #[test]
    fn resolve_item_by_prefix() {
        let s = session(&[("Burger", "10.00")]);
        let id = ids(&s)[0];
        assert_eq!(s.resolve_item(&id.short()).unwrap(), id);
        assert_eq!(s.resolve_item(&id.to_string()).unwrap(), id);
        assert!(matches!(s.resolve_item("zzzz"), Err(SplitError::UnknownItem(_))));
        assert!(matches!(
            s.resolve_item(&ItemId::issue().to_string()),
            Err(SplitError::UnknownItem(_))
        ));
    }

    #[test]
    fn reconcile_repairs_double_ownership() {
        let mut s = session(&[("Burger", "10.00")]);
        let id = ids(&s)[0];
        s.assign("Ana", &[id], d("0"), d("0")).unwrap();
        // Simulate a hand-edited session file.
        let mut json = serde_json::to_value(&s).unwrap();
        let mut bo = json["people"][0].clone();
        bo["name"] = "Bo".into();
        json["people"].as_array_mut().unwrap().push(bo);
        let mut loaded: SessionState = serde_json::from_value(json).unwrap();
        assert!(loaded.verify_partition().is_err());

        let rec = loaded.reconcile();
        assert_eq!(rec.removed_people, vec!["Bo".to_string()]);
        loaded.verify_partition().unwrap();
        assert_eq!(loaded.owner_of(id), Some("Ana"));
    }
}
