//! Commandes de zone et leurs paramètres
//!
//! Chaque commande est un `POST /cmd?cmd=<nom>` avec un corps de formulaire
//! qui porte toujours `zoneId`.

/// Commandes comprises par le contrôleur de zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneCommand {
    /// `zone.getStatus`, sert aussi à tester la validité de la session
    GetStatus,
    /// `zone.station.audio.getAll`
    GetStations,
    /// `zone.station.audio.set`
    SetStation { station_id: String },
    /// `zone.track.skip`
    Skip,
    /// `zone.track.resume`
    Resume,
    /// `zone.track.pause`. Le contrôleur n'a pas de stop, stop envoie aussi celle-ci.
    Pause,
}

impl ZoneCommand {
    /// Valeur du paramètre `cmd`
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetStatus => "zone.getStatus",
            Self::GetStations => "zone.station.audio.getAll",
            Self::SetStation { .. } => "zone.station.audio.set",
            Self::Skip => "zone.track.skip",
            Self::Resume => "zone.track.resume",
            Self::Pause => "zone.track.pause",
        }
    }

    pub fn query(&self) -> [(&'static str, &'static str); 1] {
        [("cmd", self.name())]
    }

    /// Champs du formulaire pour `zone_id`
    pub fn form(&self, zone_id: u32) -> Vec<(&'static str, String)> {
        let mut fields = vec![("zoneId", zone_id.to_string())];

        match self {
            Self::GetStations => {
                fields.push(("sortBy", "CREATION_DATE".to_string()));
                fields.push(("sortOrder", "NONE".to_string()));
            }
            Self::SetStation { station_id } => fields.push(("styleId", station_id.clone())),
            Self::Skip => fields.push(("step", "1".to_string())),
            Self::Pause => fields.push(("operationId", "0".to_string())),
            Self::GetStatus | Self::Resume => {}
        }

        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_id_always_first() {
        for command in [
            ZoneCommand::GetStatus,
            ZoneCommand::GetStations,
            ZoneCommand::SetStation {
                station_id: "12".to_string(),
            },
            ZoneCommand::Skip,
            ZoneCommand::Resume,
            ZoneCommand::Pause,
        ] {
            assert_eq!(command.form(3)[0], ("zoneId", "3".to_string()));
        }
    }

    #[test]
    fn test_per_command_fields() {
        assert_eq!(
            ZoneCommand::GetStations.form(1),
            vec![
                ("zoneId", "1".to_string()),
                ("sortBy", "CREATION_DATE".to_string()),
                ("sortOrder", "NONE".to_string()),
            ]
        );
        assert_eq!(
            ZoneCommand::SetStation {
                station_id: "abc".to_string()
            }
            .form(1)[1],
            ("styleId", "abc".to_string())
        );
        assert_eq!(ZoneCommand::Skip.form(1)[1], ("step", "1".to_string()));
        assert_eq!(ZoneCommand::Resume.form(1).len(), 1);
        assert_eq!(ZoneCommand::GetStatus.query(), [("cmd", "zone.getStatus")]);
    }
}
