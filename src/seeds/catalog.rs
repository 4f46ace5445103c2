//! Catalog seeding
//!
//! Inserts the default property types and characteristics. Entries that
//! already exist (matched by label) are left untouched, so running it on
//! every start is safe.

use anyhow::Result;
use sea_orm::DatabaseConnection;

use crate::models::CharacteristicCategory;
use crate::repositories::{
    CharacteristicInput, CharacteristicRepository, PropertyTypeInput, PropertyTypeRepository,
};

const PROPERTY_TYPES: &[(&str, &str)] = &[
    ("Appartement", "Logement dans un immeuble collectif"),
    ("Maison", "Habitation individuelle"),
    ("Studio", "Petit logement avec pièce unique"),
    ("Loft", "Grand espace ouvert"),
    ("Local commercial", "Espace dédié à une activité commerciale"),
    ("Bureau", "Espace de travail"),
    ("Entrepôt", "Espace de stockage"),
];

const CHARACTERISTICS: &[(CharacteristicCategory, &[&str])] = &[
    (
        CharacteristicCategory::Interior,
        &[
            "Cuisine équipée",
            "Cheminée",
            "Parquet",
            "Double vitrage",
            "Climatisation",
            "Mezzanine",
            "Verrière",
        ],
    ),
    (
        CharacteristicCategory::Exterior,
        &[
            "Balcon", "Terrasse", "Jardin", "Piscine", "Parking", "Garage", "Cour",
        ],
    ),
    (
        CharacteristicCategory::Security,
        &[
            "Alarme",
            "Interphone",
            "Digicode",
            "Vidéophone",
            "Porte blindée",
            "Caméra surveillance",
        ],
    ),
    (
        CharacteristicCategory::Energy,
        &[
            "Panneaux solaires",
            "Pompe à chaleur",
            "Chauffage au sol",
            "VMC double flux",
            "Isolation renforcée",
        ],
    ),
    (
        CharacteristicCategory::Comfort,
        &[
            "Ascenseur",
            "Cave",
            "Buanderie",
            "Home cinéma",
            "Domotique",
            "Fibre optique",
        ],
    ),
];

/// Seeds property types and characteristics that are not yet present.
pub async fn seed_catalog(db: &DatabaseConnection) -> Result<()> {
    let types = PropertyTypeRepository::new(db);
    let mut created_types = 0;

    for (label, description) in PROPERTY_TYPES {
        if types.find_by_label(label).await?.is_some() {
            log::debug!("Property type '{}' already exists, skipping", label);
            continue;
        }

        match types
            .create(PropertyTypeInput {
                label: (*label).to_string(),
                description: Some((*description).to_string()),
            })
            .await
        {
            Ok(_) => created_types += 1,
            Err(e) => {
                log::error!("Failed to create property type '{}': {}", label, e);
                return Err(e.into());
            }
        }
    }

    let characteristics = CharacteristicRepository::new(db);
    let mut created_characteristics = 0;

    for (category, labels) in CHARACTERISTICS {
        let existing = characteristics.list(Some(*category)).await?;
        for label in labels.iter() {
            if existing.iter().any(|c| c.label == *label) {
                continue;
            }

            match characteristics
                .create(CharacteristicInput {
                    label: (*label).to_string(),
                    category: *category,
                    description: None,
                    unit: None,
                })
                .await
            {
                Ok(_) => created_characteristics += 1,
                Err(e) => {
                    log::error!("Failed to create characteristic '{}': {}", label, e);
                    return Err(e.into());
                }
            }
        }
    }

    log::info!(
        "Catalog seeding completed: {} property types and {} characteristics created",
        created_types,
        created_characteristics
    );

    Ok(())
}
