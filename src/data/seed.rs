use crate::models::TeamSeasonRecord;

/// Serie A 2025/26 standings after matchday 19 (team, played, goals for, goals against).
const SERIE_A_TABLE: [(&str, u32, u32, u32); 20] = [
    ("Inter", 18, 40, 15),
    ("Milan", 17, 28, 13),
    ("Napoli", 18, 28, 15),
    ("Juventus", 19, 27, 16),
    ("Roma", 19, 22, 12),
    ("Como", 18, 26, 12),
    ("Atalanta", 19, 23, 19),
    ("Bologna", 18, 25, 19),
    ("Lazio", 19, 20, 16),
    ("Udinese", 19, 20, 30),
    ("Cremonese", 19, 19, 21),
    ("Sassuolo", 19, 23, 25),
    ("Torino", 19, 21, 30),
    ("Parma", 18, 12, 21),
    ("Cagliari", 19, 19, 26),
    ("Lecce", 18, 12, 25),
    ("Genoa", 18, 18, 28),
    ("Verona", 18, 15, 30),
    ("Fiorentina", 19, 20, 30),
    ("Pisa", 19, 13, 28),
];

pub fn serie_a_roster() -> Vec<TeamSeasonRecord> {
    SERIE_A_TABLE
        .iter()
        .map(|&(name, played, gf, ga)| TeamSeasonRecord::new(name, played, gf, ga))
        .collect()
}
