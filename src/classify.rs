//! Asset-path classification.
//!
//! Maps raw bundle-internal asset paths to a canonical output location.
//! The rule table is the single source of truth for which asset kinds the
//! rest of the pipeline understands: adding support for a new kind means
//! adding one [`Rule`] here, nothing else.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use thiserror::Error;

/// Numeric asset category. `0..100` are image assets, `100..200` are
/// structured (scripted JSON) assets.
pub type Category = u16;

/// First category reserved for structured assets.
pub const SCRIPTED_CATEGORY_BASE: Category = 100;
/// One past the last structured category.
pub const CATEGORY_LIMIT: Category = 200;

/// Canonical output location for one classified asset path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    pub out_dir: &'static str,
    /// Empty for asset kinds without a variant subdirectory.
    pub out_subdir: String,
    pub file_name: String,
}

/// Errors raised when a rule matches but its captures disagree.
///
/// A mismatch means the remote started publishing paths this rule table
/// does not actually describe; it is a mapping bug, not a skippable path.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("inconsistent {field} captures in asset path {path:?}")]
    CaptureMismatch {
        path: String,
        field: &'static str,
    },
}

/// One entry of the ordered classification table.
///
/// `build` receives the regex captures (match guaranteed) and the original
/// path (for error messages) and produces `(out_subdir, file_name)`.
struct Rule {
    category: Category,
    out_dir: &'static str,
    pattern: &'static LazyLock<Regex>,
    build: fn(&Captures<'_>, &str) -> Result<(String, String), ClassifyError>,
}

macro_rules! rule_pattern {
    ($name:ident, $regex:expr) => {
        static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

rule_pattern!(
    UNIT_SQUARE,
    r"^assets/east/units/([0-9]+)/([0-9]+)/thumbnail/square\.png$"
);
rule_pattern!(
    UNIT_COSTUME,
    r"^assets/east/units/([0-9]+)/([0-9]+)/thumbnail/costume\.png$"
);
rule_pattern!(
    UNIT_CHANGE,
    r"^assets/east/units/([0-9]+)/([0-9]+)/thumbnail/change\.png$"
);
rule_pattern!(
    UNIT_FULL_BODY,
    r"^assets/east/units/([0-9]+)/([0-9]+)/g([0-9]+)/g([0-9]+)\.png$"
);
rule_pattern!(
    UNIT_ICON_FACE,
    r"^assets/east/units/([0-9]+)/([0-9]+)/thumbnail/iconface\.png$"
);
rule_pattern!(
    UNIT_SHOT_ICON,
    r"^assets/east/units/([0-9]+)/([0-9]+)/ui/sprite/(shot|spell)_btn_([a-c])\.png$"
);
rule_pattern!(
    PICTURE_SQUARE,
    r"^assets/east/pictures/([0-9]+)/thumbsquare\.png$"
);
rule_pattern!(
    PICTURE_LARGE,
    r"^assets/east/pictures/([0-9]+)/thumblarge\.png$"
);
rule_pattern!(PICTURE_EFUDA, r"^assets/east/pictures/([0-9]+)/efuda\.png$");
rule_pattern!(COMIC_BG, r"^assets/east/graphics/comic/bg/([0-9]+)\.png$");
rule_pattern!(
    TIMELINE,
    r"^assets/east/units/([0-9]+)/timeline/barrage([12347])([0123])\.asset$"
);
rule_pattern!(COMIC_EPISODE, r"^assets/east/comics/uo/(.*)\.asset$");

/// The classification table, evaluated top to bottom; first match wins.
///
/// Ordering is part of the contract: no later rule may match an input an
/// earlier rule already claims with a different output.
static RULES: &[Rule] = &[
    // Unit square thumbnail:
    //   assets/east/units/1003/03/thumbnail/square.png -> UnitSquare/AltCostume/S100303.png
    Rule {
        category: 0,
        out_dir: "UnitSquare",
        pattern: &UNIT_SQUARE,
        build: |c, _| Ok((costume_subdir(&c[2]).to_string(), format!("S{}{}.png", &c[1], &c[2]))),
    },
    // Unit gallery/pray thumbnail:
    //   assets/east/units/1003/06/thumbnail/costume.png -> UnitCostume/AltCostume/C100306.png
    Rule {
        category: 1,
        out_dir: "UnitCostume",
        pattern: &UNIT_COSTUME,
        build: |c, _| Ok((costume_subdir(&c[2]).to_string(), format!("C{}{}.png", &c[1], &c[2]))),
    },
    // Unit half-body thumbnail:
    //   assets/east/units/1003/03/thumbnail/change.png -> UnitChange/AltCostume/CH100303.png
    Rule {
        category: 2,
        out_dir: "UnitChange",
        pattern: &UNIT_CHANGE,
        build: |c, _| Ok((costume_subdir(&c[2]).to_string(), format!("CH{}{}.png", &c[1], &c[2]))),
    },
    // Unit full-body sprite. The g-segments repeat unit and costume id and
    // must agree with the directory captures:
    //   assets/east/units/1003/03/g100303/g100303.png -> UnitFullBody/AltCostume/G100303.png
    Rule {
        category: 3,
        out_dir: "UnitFullBody",
        pattern: &UNIT_FULL_BODY,
        build: build_unit_full_body,
    },
    // Unit icon face:
    //   assets/east/units/1100/01/thumbnail/iconface.png -> UnitIconFace/Original/IF110001.png
    Rule {
        category: 4,
        out_dir: "UnitIconFace",
        pattern: &UNIT_ICON_FACE,
        build: |c, _| Ok((costume_subdir(&c[2]).to_string(), format!("IF{}{}.png", &c[1], &c[2]))),
    },
    // Unit shot/spellcard button icon:
    //   assets/east/units/1003/04/ui/sprite/spell_btn_a.png -> UnitShotIcon/AltCostume/SPB100304A.png
    Rule {
        category: 5,
        out_dir: "UnitShotIcon",
        pattern: &UNIT_SHOT_ICON,
        build: |c, _| {
            let prefix = if &c[3] == "shot" { "SHB" } else { "SPB" };
            let file = format!("{}{}{}{}.png", prefix, &c[1], &c[2], c[4].to_ascii_uppercase());
            Ok((costume_subdir(&c[2]).to_string(), file))
        },
    },
    // Picture square thumbnail:
    //   assets/east/pictures/319/thumbsquare.png -> PictureSquare/PTS319.png
    Rule {
        category: 6,
        out_dir: "PictureSquare",
        pattern: &PICTURE_SQUARE,
        build: |c, _| Ok((String::new(), format!("PTS{}.png", &c[1]))),
    },
    // Picture gallery/pray thumbnail:
    //   assets/east/pictures/319/thumblarge.png -> PictureLarge/PTL319.png
    Rule {
        category: 7,
        out_dir: "PictureLarge",
        pattern: &PICTURE_LARGE,
        build: |c, _| Ok((String::new(), format!("PTL{}.png", &c[1]))),
    },
    // Picture full image:
    //   assets/east/pictures/319/efuda.png -> PictureEfuda/PE319.png
    Rule {
        category: 8,
        out_dir: "PictureEfuda",
        pattern: &PICTURE_EFUDA,
        build: |c, _| Ok((String::new(), format!("PE{}.png", &c[1]))),
    },
    // Comic background:
    //   assets/east/graphics/comic/bg/10340101.png -> ComicBackGround/CBG10340101.png
    Rule {
        category: 9,
        out_dir: "ComicBackGround",
        pattern: &COMIC_BG,
        build: |c, _| Ok((String::new(), format!("CBG{}.png", &c[1]))),
    },
    // Unit barrage timeline script; decoded output is JSON:
    //   assets/east/units/1025/timeline/barrage10.asset -> Timeline/TB102510.json
    Rule {
        category: 100,
        out_dir: "Timeline",
        pattern: &TIMELINE,
        build: |c, _| Ok((String::new(), format!("TB{}{}{}.json", &c[1], &c[2], &c[3]))),
    },
    // Plot/comic episode script; nested path flattened with dashes:
    //   assets/east/comics/uo/event16/extra/episode4.asset -> Comic/event16-extra-episode4.json
    Rule {
        category: 101,
        out_dir: "Comic",
        pattern: &COMIC_EPISODE,
        build: |c, _| Ok((String::new(), format!("{}.json", c[1].replace('/', "-")))),
    },
];

/// Costume id `"01"` is the canonical variant; everything else is an
/// alternate costume. Selects the output subdirectory, never a suffix.
fn costume_subdir(costume_id: &str) -> &'static str {
    if costume_id == "01" {
        "Original"
    } else {
        "AltCostume"
    }
}

fn build_unit_full_body(c: &Captures<'_>, path: &str) -> Result<(String, String), ClassifyError> {
    let unit = &c[1];
    let costume = &c[2];
    let (dir_unit, dir_costume) = split_tail2(&c[3]);
    let (file_unit, _) = split_tail2(&c[4]);
    if dir_unit != unit || file_unit != unit {
        return Err(ClassifyError::CaptureMismatch {
            path: path.to_string(),
            field: "unit id",
        });
    }
    if dir_costume != costume {
        return Err(ClassifyError::CaptureMismatch {
            path: path.to_string(),
            field: "costume id",
        });
    }
    Ok((costume_subdir(costume).to_string(), format!("G{}{}.png", unit, costume)))
}

/// Split off the last two characters (captures are ASCII digits).
fn split_tail2(s: &str) -> (&str, &str) {
    s.split_at(s.len().saturating_sub(2))
}

/// Classify a raw asset path against the rule table.
///
/// Matching is case-insensitive. Returns `Ok(None)` when no rule matches —
/// most paths inside a bundle (audio, shaders, unrelated scripts) are of no
/// interest and are skipped silently. A matching rule whose captures are
/// internally inconsistent is a hard [`ClassifyError`].
pub fn classify(raw_path: &str) -> Result<Option<Classification>, ClassifyError> {
    let path = raw_path.to_ascii_lowercase();
    for rule in RULES {
        if let Some(caps) = rule.pattern.captures(&path) {
            let (out_subdir, file_name) = (rule.build)(&caps, raw_path)?;
            return Ok(Some(Classification {
                category: rule.category,
                out_dir: rule.out_dir,
                out_subdir,
                file_name,
            }));
        }
    }
    Ok(None)
}
