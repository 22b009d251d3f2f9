//! Property-based tests for duration handling and identifier resolution.

use proptest::prelude::*;
use warden_discord::{
    ChannelView, GuildView, MemberView, RoleView, SendOverride, find_channel, find_role,
    format_duration, parse_duration,
};

const UNITS: &[(&str, u64)] = &[
    ("s", 1_000),
    ("m", 60_000),
    ("h", 3_600_000),
    ("d", 86_400_000),
    ("w", 604_800_000),
];

fn guild(role_id: &str, role_name: &str, channel_name: &str) -> GuildView {
    GuildView {
        id: "g1".to_string(),
        name: "ops".to_string(),
        everyone_role_id: "g1".to_string(),
        bot_user_id: "bot".to_string(),
        roles: vec![
            RoleView {
                id: "g1".to_string(),
                name: "@everyone".to_string(),
                position: 0,
            },
            RoleView {
                id: role_id.to_string(),
                name: role_name.to_string(),
                position: 3,
            },
        ],
        channels: vec![ChannelView {
            id: "c1".to_string(),
            name: channel_name.to_string(),
            everyone_send: SendOverride::Inherit,
        }],
        members: vec![MemberView {
            user_id: "bot".to_string(),
            username: "warden".to_string(),
            role_ids: vec![],
            manage_roles: true,
            manage_channels: true,
        }],
    }
}

proptest! {
    // Every unit suffix converts with its fixed multiplier, whatever the
    // casing or spacing.
    #[test]
    fn every_unit_converts_exactly(
        amount in 0u64..=1_000_000,
        unit in proptest::sample::select(UNITS),
    ) {
        let (suffix, multiplier) = unit;
        let expected = amount * multiplier;
        prop_assert_eq!(parse_duration(&format!("{amount}{suffix}")), expected);
        prop_assert_eq!(
            parse_duration(&format!("{amount} {}", suffix.to_uppercase())),
            expected
        );
    }

    // A bare number is seconds.
    #[test]
    fn bare_numbers_are_seconds(amount in 0u64..=1_000_000) {
        prop_assert_eq!(parse_duration(&amount.to_string()), amount * 1_000);
    }

    // Anything that is not a number-with-optional-unit parses to zero.
    #[test]
    fn non_durations_parse_to_zero(input in "[a-z]{1,8}( [a-z]{1,8}){0,2}") {
        prop_assert_eq!(parse_duration(&input), 0);
    }

    // Rendering picks the largest whole unit below the day cutoff,
    // floor-rounds the count, and always pluralizes the unit word.
    #[test]
    fn formatting_floor_rounds_largest_unit(ms in 0u64..=10_000_000_000u64) {
        let rendered = format_duration(ms);
        let (count, unit) = rendered.split_once(' ').unwrap();
        let count: u64 = count.parse().unwrap();
        match unit {
            "seconds" => {
                prop_assert!(ms < 60_000);
                prop_assert_eq!(count, ms / 1_000);
            }
            "minutes" => {
                prop_assert!((60_000..3_600_000).contains(&ms));
                prop_assert_eq!(count, ms / 60_000);
            }
            "hours" => {
                prop_assert!((3_600_000..86_400_000).contains(&ms));
                prop_assert_eq!(count, ms / 3_600_000);
            }
            "days" => {
                prop_assert!(ms >= 86_400_000);
                prop_assert_eq!(count, ms / 86_400_000);
            }
            other => prop_assert!(false, "unexpected unit '{}'", other),
        }
    }

    // Channel resolution ignores a leading `#` and name casing.
    #[test]
    fn channel_resolution_ignores_hash_and_case(name in "[a-z][a-z0-9_-]{0,10}") {
        let guild = guild("r1", "helper", &name);
        let hit = find_channel(&guild, &format!("#{name}")).map(|c| c.id.as_str());
        prop_assert_eq!(hit, Some("c1"));
        let hit = find_channel(&guild, &name.to_uppercase()).map(|c| c.id.as_str());
        prop_assert_eq!(hit, Some("c1"));
    }

    // An exact id match always wins over a role that merely shares the name.
    #[test]
    fn role_id_match_wins_over_name(ident in "[a-z]{1,8}") {
        let mut guild = guild(&ident, "alpha", "general");
        guild.roles.push(RoleView {
            id: "r-other".to_string(),
            name: ident.clone(),
            position: 5,
        });
        let hit = find_role(&guild, &ident).unwrap();
        prop_assert_eq!(hit.id.as_str(), ident.as_str());
    }
}
