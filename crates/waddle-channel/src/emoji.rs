// SPDX-FileCopyrightText: 2026 Waddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! QQ built-in face ids mapped to Unicode emoji.
//!
//! Covers the classic face set shipped with the desktop client. Ids added in
//! newer client releases fall back to [`UNKNOWN_FACE`] so the text still shows
//! that something was there.

/// Placeholder for face ids without a Unicode equivalent.
pub const UNKNOWN_FACE: &str = "❓";

/// Emoji rendering of a QQ face id.
pub fn face_to_emoji(id: u32) -> &'static str {
    match id {
        0 => "😲",
        1 => "😖",
        2 => "😍",
        3 => "😳",
        4 => "😎",
        5 => "😭",
        6 => "☺️",
        7 => "😷",
        8 => "😴",
        9 => "😢",
        10 => "😰",
        11 => "😡",
        12 => "😝",
        13 => "😁",
        14 => "🙂",
        15 => "🙁",
        16 => "🆒",
        18 => "😤",
        19 => "🤮",
        20 => "😜",
        21 => "☺️",
        22 => "🙄",
        23 => "😕",
        24 => "😋",
        25 => "😪",
        26 => "😨",
        27 => "😓",
        28 => "😄",
        29 => "😏",
        30 => "💪",
        31 => "🤬",
        32 => "❓",
        33 => "🤫",
        34 => "😵",
        35 => "😩",
        36 => "😞",
        37 => "💀",
        38 => "👊",
        39 => "👋",
        41 => "😮",
        42 => "💑",
        43 => "🕺",
        46 => "🐷",
        49 => "🤗",
        53 => "🎂",
        54 => "⚡",
        55 => "💣",
        56 => "🔪",
        57 => "⚽",
        59 => "💩",
        60 => "☕",
        61 => "🍚",
        63 => "🌹",
        64 => "🥀",
        66 => "❤️",
        67 => "💔",
        69 => "🎁",
        74 => "🌞",
        75 => "🌛",
        76 => "👍",
        77 => "👎",
        78 => "🤝",
        79 => "✌️",
        85 => "😘",
        86 => "😠",
        89 => "🍉",
        96 => "😅",
        97 => "😓",
        98 => "🤷",
        99 => "👏",
        100 => "😳",
        101 => "😬",
        102 => "😾",
        103 => "😾",
        104 => "🥱",
        105 => "😒",
        106 => "😟",
        107 => "😢",
        108 => "😈",
        109 => "😚",
        110 => "😲",
        111 => "🥺",
        112 => "🔪",
        113 => "🍺",
        114 => "🏀",
        115 => "🏓",
        117 => "🐞",
        118 => "🙏",
        119 => "👈",
        120 => "✊",
        121 => "👎",
        122 => "🤟",
        123 => "🙅",
        124 => "👌",
        125 => "🔄",
        129 => "👋",
        137 => "🧨",
        144 => "🎉",
        145 => "🙏",
        146 => "😠",
        147 => "🍭",
        148 => "🍼",
        151 => "✈️",
        158 => "💵",
        168 => "💊",
        169 => "🔫",
        171 => "🍵",
        172 => "😉",
        173 => "😭",
        174 => "🤷",
        175 => "😚",
        176 => "😖",
        177 => "🤧",
        178 => "😏",
        179 => "🐶",
        180 => "😲",
        181 => "😛",
        182 => "😂",
        183 => "🤳",
        201 => "👍",
        212 => "🤔",
        _ => UNKNOWN_FACE,
    }
}
