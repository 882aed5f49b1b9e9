use std::time::Duration;

use concierge_analytics::Leaderboard;
use concierge_core::{fill_placeholders, mention_of, ResponseTemplates};

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: u64 = 24 * SECONDS_PER_HOUR;

/// Coarsest applicable unit set: days+hours+minutes, else hours+minutes, else minutes.
pub fn format_uptime(uptime: Duration) -> String {
    let total = uptime.as_secs();
    let days = total / SECONDS_PER_DAY;
    let hours = (total % SECONDS_PER_DAY) / SECONDS_PER_HOUR;
    let minutes = (total % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;
    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes} minutes")
    }
}

/// Zero-based rank to medal.
pub fn medal_for_rank(rank: usize) -> &'static str {
    match rank {
        0 => "🥇",
        1 => "🥈",
        2 => "🥉",
        _ => "🏅",
    }
}

pub fn render_leaderboard(leaderboard: &Leaderboard, responses: &ResponseTemplates) -> String {
    match leaderboard {
        Leaderboard::NoData => responses.leaderboard_no_data.clone(),
        Leaderboard::Unavailable => responses.leaderboard_unavailable.clone(),
        Leaderboard::Ranked(entries) => entries
            .iter()
            .enumerate()
            .map(|(rank, entry)| {
                let user = mention_of(&entry.staff_id);
                let count = entry.count.to_string();
                fill_placeholders(
                    &responses.leaderboard_entry,
                    &[
                        ("medal", medal_for_rank(rank)),
                        ("user", user.as_str()),
                        ("count", count.as_str()),
                    ],
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use concierge_analytics::{Leaderboard, StaffTally};
    use concierge_core::ResponseTemplates;

    use super::{format_uptime, medal_for_rank, render_leaderboard};

    #[test]
    fn unit_format_uptime_picks_coarsest_unit() {
        assert_eq!(format_uptime(Duration::from_secs(59)), "0 minutes");
        assert_eq!(format_uptime(Duration::from_secs(5 * 60 + 30)), "5 minutes");
        assert_eq!(format_uptime(Duration::from_secs(3 * 3600 + 7 * 60)), "3h 7m");
        assert_eq!(
            format_uptime(Duration::from_secs(2 * 86_400 + 3600 + 60)),
            "2d 1h 1m"
        );
        assert_eq!(format_uptime(Duration::from_secs(86_400)), "1d 0h 0m");
    }

    #[test]
    fn unit_medals_cover_top_three_then_repeat() {
        let medals = (0..5).map(medal_for_rank).collect::<Vec<_>>();
        assert_eq!(medals, vec!["🥇", "🥈", "🥉", "🏅", "🏅"]);
    }

    #[test]
    fn functional_leaderboard_renders_one_line_per_rank() {
        let responses = ResponseTemplates::default();
        let rendered = render_leaderboard(
            &Leaderboard::Ranked(vec![
                StaffTally {
                    staff_id: "111111111111111111".to_string(),
                    count: 40,
                },
                StaffTally {
                    staff_id: "222222222222222222".to_string(),
                    count: 25,
                },
            ]),
            &responses,
        );
        assert_eq!(
            rendered,
            "🥇 <@111111111111111111>: `40 tickets`\n🥈 <@222222222222222222>: `25 tickets`"
        );
    }

    #[test]
    fn unit_no_data_and_unavailable_render_distinct_text() {
        let responses = ResponseTemplates::default();
        let no_data = render_leaderboard(&Leaderboard::NoData, &responses);
        let unavailable = render_leaderboard(&Leaderboard::Unavailable, &responses);
        assert_eq!(no_data, responses.leaderboard_no_data);
        assert_eq!(unavailable, responses.leaderboard_unavailable);
        assert_ne!(no_data, unavailable);
    }
}
