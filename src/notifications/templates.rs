use crate::alerts::MissedType;

pub struct NotificationTemplates;

impl NotificationTemplates {
    /// Parent-facing message for a student who missed a required scan.
    pub fn unscanned_message(student_name: &str, missed: MissedType) -> String {
        match missed {
            MissedType::Morning => format!(
                "⚠️ SafePass Alert: {} has not scanned in this morning. Please confirm attendance.",
                student_name
            ),
            MissedType::Afternoon => format!(
                "⚠️ SafePass Alert: {} has not scanned out this afternoon. Please confirm pickup.",
                student_name
            ),
        }
    }

    /// Short text shown on the blocking allergy alert.
    pub fn allergy_banner(student_name: &str, allergies: &[String], location: &str) -> String {
        format!(
            "🚨 ALLERGY ALERT: {} ({}) scanned at {}",
            student_name,
            allergies.join(", "),
            location
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn morning_and_afternoon_messages_differ() {
        let morning = NotificationTemplates::unscanned_message("Ada", MissedType::Morning);
        let afternoon = NotificationTemplates::unscanned_message("Ada", MissedType::Afternoon);
        assert!(morning.contains("has not scanned in this morning"));
        assert!(afternoon.contains("Please confirm pickup"));
    }

    #[test]
    fn allergy_banner_lists_every_allergy() {
        let text = NotificationTemplates::allergy_banner(
            "Sam",
            &["Peanuts".to_string(), "Shellfish".to_string()],
            "Cafeteria",
        );
        assert_eq!(text, "🚨 ALLERGY ALERT: Sam (Peanuts, Shellfish) scanned at Cafeteria");
    }
}
