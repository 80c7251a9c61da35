use crate::metadata::{Channel, Video};
use crate::semantic::{snippet, NeighborResult};

const CHANNEL_DESCRIPTION_CHARS: usize = 300;
const VIDEO_TITLE_CHARS: usize = 120;
const VIDEO_DESCRIPTION_CHARS: usize = 240;
const PROMPT_MAX_CHARS: usize = 8000;

const TASK: &str = "TASK: Using the above, produce a concise JSON object with keys: \
executive_summary (string), themes (list of strings), top_recommendations \
(list of short objects with title/priority), and short_actionable_tips (list). \
Keep output minimal and JSON only.";

/// Condense a channel, its sampled uploads and the anchor neighbors into a
/// single prompt.
pub fn build_prompt(channel: &Channel, videos: &[Video], neighbors: &[NeighborResult]) -> String {
    let mut lines = vec![
        format!(
            "Channel: {}\nDescription: {}",
            channel.title,
            snippet(&channel.description, CHANNEL_DESCRIPTION_CHARS)
        ),
        "\nVideos (sample):".to_string(),
    ];

    for video in videos {
        lines.push(format!(
            "- {}\n  {}",
            snippet(&video.title, VIDEO_TITLE_CHARS),
            snippet(&video.description, VIDEO_DESCRIPTION_CHARS)
        ));
    }

    if !neighbors.is_empty() {
        lines.push("\nTop semantic neighbors (video ids & distance):".to_string());
        for n in neighbors {
            lines.push(format!("- {} (distance={:.4})", n.id, n.distance));
        }
    }

    lines.push(format!("\n{TASK}"));

    let prompt = lines.join("\n");
    snippet(&prompt, PROMPT_MAX_CHARS).to_string()
}
