//! The narrator's context bundle.

use cortex_core::content::ContentBlock;
use cortex_core::entity::{Campaign, Character, Threat, Vitals};
use serde::Serialize;

use super::tags::RuleTag;

/// Placed in the threats section when the encounter is empty.
pub const NO_THREATS_SENTINEL: &str = "None. If enemies appear, introduce them through \
     mechanics.threats_layer.spawn with a name and base_hp.";

/// Everything the narrator knows about the current scene.
///
/// Sections render in a fixed order: campaign setting, character sheet,
/// active threats, rule modules, instruction guides. None of them is
/// truncated.
#[derive(Debug, Clone)]
pub struct ContextBundle {
    pub campaign: Campaign,
    pub character: Character,
    pub vitals: Vitals,
    pub threats: Vec<Threat>,
    /// Tags the content was fetched for, `core` first.
    pub tags: Vec<RuleTag>,
    pub rules: Vec<ContentBlock>,
    pub instructions: Vec<ContentBlock>,
}

#[derive(Serialize)]
struct KnownMoves<'a> {
    passive: &'a str,
    active1: &'a str,
    active2: &'a str,
    details: &'a Option<cortex_core::entity::SkillDetails>,
    equipment: &'a Option<cortex_core::entity::Equipment>,
}

#[derive(Serialize)]
struct ThreatLine<'a> {
    name: &'a str,
    hp: String,
}

impl ContextBundle {
    /// Whether a rule module for `tag` made it into the bundle.
    #[must_use]
    pub fn has_rule(&self, tag: RuleTag) -> bool {
        self.rules.iter().any(|b| b.category == tag.as_str())
    }

    /// Renders the bundle as tagged sections for the narrator prompt.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str("<campaign_setting>\n");
        out.push_str(&format!("<title>{}</title>\n", self.campaign.title));
        out.push_str(&format!(
            "<description>{}</description>\n",
            self.campaign.description
        ));
        out.push_str("</campaign_setting>\n");

        self.render_character(&mut out);
        self.render_threats(&mut out);

        if !self.rules.is_empty() {
            out.push_str("<active_rules>\n");
            for block in &self.rules {
                out.push_str(&format!(
                    "<module name=\"{}\">{}</module>\n",
                    block.category, block.content
                ));
            }
            out.push_str("</active_rules>\n");
        }

        if !self.instructions.is_empty() {
            out.push_str("<active_instructions>\n");
            for block in &self.instructions {
                out.push_str(&format!(
                    "<guide name=\"{}\">{}</guide>\n",
                    block.category, block.content
                ));
            }
            out.push_str("</active_instructions>\n");
        }

        out
    }

    fn render_character(&self, out: &mut String) {
        let c = &self.character;
        let v = self.vitals;
        let moves = KnownMoves {
            passive: &c.skills.passive,
            active1: &c.skills.active1,
            active2: &c.skills.active2,
            details: &c.skills.details,
            equipment: &c.skills.equipment,
        };

        out.push_str("<character_sheet>\n");
        out.push_str(&format!("<name>{}</name>\n", c.name));
        out.push_str(&format!(
            "<visual_appearance>{}</visual_appearance>\n",
            c.physical_description
        ));
        out.push_str(&format!("<origin>{}</origin>\n", c.origin_description));
        out.push_str("<status>\n");
        out.push_str(&format!(
            "<hp current=\"{}\" max=\"{}\" />\n",
            v.current_hp, v.max_hp
        ));
        out.push_str(&format!(
            "<mp current=\"{}\" max=\"{}\" />\n",
            v.current_mp, v.max_mp
        ));
        out.push_str("</status>\n");
        out.push_str(&format!(
            "<known_moves>\n{}\n</known_moves>\n",
            serde_json::to_string_pretty(&moves).unwrap_or_default()
        ));
        out.push_str(&format!(
            "<attributes>{}</attributes>\n",
            serde_json::to_string(&c.attributes).unwrap_or_default()
        ));
        out.push_str("</character_sheet>\n");
    }

    fn render_threats(&self, out: &mut String) {
        out.push_str("<active_threats>\n");
        if self.threats.is_empty() {
            out.push_str(NO_THREATS_SENTINEL);
            out.push('\n');
        } else {
            let lines: Vec<ThreatLine<'_>> = self
                .threats
                .iter()
                .map(|t| ThreatLine {
                    name: &t.name,
                    hp: format!("{}/{}", t.current_hp, t.max_hp),
                })
                .collect();
            out.push_str(&serde_json::to_string_pretty(&lines).unwrap_or_default());
            out.push('\n');
        }
        out.push_str("</active_threats>\n");
    }
}

#[cfg(test)]
mod tests {
    use cortex_core::entity::ThreatStatus;
    use cortex_test_support::{fixed_now, sample_campaign, sample_character};
    use uuid::Uuid;

    use super::*;

    fn bundle(threats: Vec<Threat>) -> ContextBundle {
        let campaign = sample_campaign();
        let character = sample_character(campaign.id);
        let vitals = character.vitals();
        ContextBundle {
            campaign,
            character,
            vitals,
            threats,
            tags: vec![RuleTag::Core, RuleTag::Combat],
            rules: vec![
                ContentBlock::new("core", "Roll d8s; evens succeed."),
                ContentBlock::new("combat", "Damage comes from weapons."),
            ],
            instructions: vec![ContentBlock::new("core", "Be fair.")],
        }
    }

    fn position(haystack: &str, needle: &str) -> usize {
        haystack
            .find(needle)
            .unwrap_or_else(|| panic!("missing section {needle}"))
    }

    #[test]
    fn test_render_keeps_section_order() {
        let rendered = bundle(Vec::new()).render();

        let order = [
            "<campaign_setting>",
            "<character_sheet>",
            "<active_threats>",
            "<active_rules>",
            "<active_instructions>",
        ]
        .map(|section| position(&rendered, section));

        assert!(order.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_render_without_threats_emits_sentinel() {
        let rendered = bundle(Vec::new()).render();

        assert!(rendered.contains(NO_THREATS_SENTINEL));
    }

    #[test]
    fn test_render_lists_threat_hp() {
        let campaign = sample_campaign();
        let threat = Threat {
            id: Uuid::new_v4(),
            campaign_id: campaign.id,
            character_id: Uuid::new_v4(),
            name: "Drone 1".to_owned(),
            current_hp: 3,
            max_hp: 5,
            status: ThreatStatus::Active,
            created_at: fixed_now(),
        };

        let rendered = bundle(vec![threat]).render();

        assert!(rendered.contains("\"name\": \"Drone 1\""));
        assert!(rendered.contains("\"hp\": \"3/5\""));
        assert!(!rendered.contains(NO_THREATS_SENTINEL));
    }

    #[test]
    fn test_render_tags_blocks_with_their_category() {
        let rendered = bundle(Vec::new()).render();

        assert!(rendered.contains("<module name=\"core\">Roll d8s; evens succeed.</module>"));
        assert!(rendered.contains("<module name=\"combat\">"));
        assert!(rendered.contains("<guide name=\"core\">Be fair.</guide>"));
    }

    #[test]
    fn test_render_includes_vitals_and_attributes() {
        let rendered = bundle(Vec::new()).render();

        assert!(rendered.contains("<hp current=\"10\" max=\"10\" />"));
        assert!(rendered.contains("<mp current=\"5\" max=\"5\" />"));
        assert!(rendered.contains("\"brute\":5"));
    }
}
