/// Meal participant roster
///
/// Pure functions over preference state: counting participants for meal cards and
/// producing the single ordered roster shown on a meal's detail view.
///
/// # Ordering
///
/// 1. Members with a decided preference come first, members still `undecided` last.
/// 2. Decided members are ordered by the preference's wire value (`eat-later`,
///    `opt-in`, `opt-out`).
/// 3. Ties are broken by username.
///
/// The sort is stable, so members with equal keys keep their input order.

use serde::Serialize;
use std::cmp::Ordering;
use uuid::Uuid;

use crate::models::membership::MemberRow;
use crate::models::meal_preference::{Preference, PreferenceRecord};

/// One member's line on a meal roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user_id: Uuid,
    pub username: String,

    /// None for members who never touched this meal
    pub preference_id: Option<Uuid>,

    pub preference: Preference,
    pub is_cook: bool,
}

impl Participant {
    /// Roster line for an active member with no preference row
    pub fn undecided(user_id: Uuid, username: impl Into<String>) -> Self {
        Participant {
            user_id,
            username: username.into(),
            preference_id: None,
            preference: Preference::Undecided,
            is_cook: false,
        }
    }
}

impl From<PreferenceRecord> for Participant {
    fn from(record: PreferenceRecord) -> Self {
        Participant {
            user_id: record.user_id,
            username: record.username,
            preference_id: Some(record.id),
            preference: record.preference,
            is_cook: record.is_cook,
        }
    }
}

impl From<MemberRow> for Participant {
    fn from(member: MemberRow) -> Self {
        Participant::undecided(member.user_id, member.username)
    }
}

/// Number of preferences other than `undecided`
pub fn participant_count<'a>(preferences: impl IntoIterator<Item = &'a Preference>) -> usize {
    preferences.into_iter().filter(|p| p.is_decided()).count()
}

/// Roster comparator: decided before undecided, then preference value, then username
pub fn compare_participants(a: &Participant, b: &Participant) -> Ordering {
    let a_undecided = !a.preference.is_decided();
    let b_undecided = !b.preference.is_decided();

    a_undecided
        .cmp(&b_undecided)
        .then_with(|| a.preference.as_str().cmp(b.preference.as_str()))
        .then_with(|| a.username.cmp(&b.username))
}

/// Merges members with a preference row and members without one into a single roster
pub fn merge_and_sort_participants(
    with_preference: Vec<Participant>,
    without_preference: Vec<Participant>,
) -> Vec<Participant> {
    let mut roster = with_preference;
    roster.extend(without_preference);
    roster.sort_by(compare_participants);
    roster
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;

    fn participant(username: &str, preference: Preference) -> Participant {
        Participant {
            user_id: Uuid::new_v4(),
            username: username.to_string(),
            preference_id: Some(Uuid::new_v4()),
            preference,
            is_cook: false,
        }
    }

    #[test]
    fn test_participant_count() {
        let preferences = [
            Preference::OptIn,
            Preference::Undecided,
            Preference::OptOut,
            Preference::EatLater,
            Preference::Undecided,
        ];
        assert_eq!(participant_count(&preferences), 3);
        assert_eq!(participant_count(&[] as &[Preference]), 0);
    }

    #[test]
    fn test_merge_orders_roster() {
        let with = vec![
            participant("zoe", Preference::OptIn),
            participant("bob", Preference::Undecided),
            participant("amy", Preference::OptOut),
            participant("carl", Preference::EatLater),
            participant("ann", Preference::OptIn),
        ];
        let without = vec![
            Participant::undecided(Uuid::new_v4(), "dave"),
            Participant::undecided(Uuid::new_v4(), "abe"),
        ];

        let roster = merge_and_sort_participants(with, without);
        let names: Vec<&str> = roster.iter().map(|p| p.username.as_str()).collect();

        assert_eq!(names, vec!["carl", "ann", "zoe", "amy", "abe", "bob", "dave"]);
    }

    #[test]
    fn test_undecided_always_last_for_any_input_order() {
        let mut rng = rand::thread_rng();
        let mut people: Vec<Participant> = Vec::new();
        for (i, preference) in Preference::ALL.iter().cycle().take(24).enumerate() {
            people.push(participant(&format!("user{:02}", i % 7), *preference));
        }

        for _ in 0..50 {
            people.shuffle(&mut rng);
            let split = people.len() / 2;
            let roster = merge_and_sort_participants(
                people[..split].to_vec(),
                people[split..].to_vec(),
            );

            let first_undecided = roster
                .iter()
                .position(|p| p.preference == Preference::Undecided)
                .unwrap();
            assert!(roster[first_undecided..]
                .iter()
                .all(|p| p.preference == Preference::Undecided));
            assert!(roster[..first_undecided]
                .iter()
                .all(|p| p.preference.is_decided()));

            assert!(roster
                .windows(2)
                .all(|w| compare_participants(&w[0], &w[1]) != Ordering::Greater));
        }
    }

    #[test]
    fn test_sort_is_stable_for_equal_keys() {
        let twins: Vec<Participant> = (0..5).map(|_| participant("sam", Preference::OptIn)).collect();
        let ids: Vec<Uuid> = twins.iter().map(|p| p.user_id).collect();

        let roster = merge_and_sort_participants(
            vec![participant("zed", Preference::Undecided)],
            twins,
        );

        let sorted_ids: Vec<Uuid> = roster[..5].iter().map(|p| p.user_id).collect();
        assert_eq!(sorted_ids, ids);
        assert_eq!(roster[5].username, "zed");
    }

    #[test]
    fn test_same_multiset_sorts_to_same_keys() {
        let mut rng = rand::thread_rng();
        let mut people = vec![
            participant("mia", Preference::OptOut),
            participant("leo", Preference::EatLater),
            participant("ivy", Preference::Undecided),
            participant("eli", Preference::OptIn),
            participant("ada", Preference::OptOut),
        ];

        let expected: Vec<String> = merge_and_sort_participants(people.clone(), Vec::new())
            .into_iter()
            .map(|p| p.username)
            .collect();

        for _ in 0..20 {
            people.shuffle(&mut rng);
            let names: Vec<String> = merge_and_sort_participants(Vec::new(), people.clone())
                .into_iter()
                .map(|p| p.username)
                .collect();
            assert_eq!(names, expected);
        }
    }
}
