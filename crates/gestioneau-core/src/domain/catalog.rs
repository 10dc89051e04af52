//! Entity catalog
//!
//! Every entity of the back-office, described once. The order of [`CATALOG`]
//! is dependency order: an entity only references entities listed before it.

use super::descriptor::{
    EntityDescriptor, FieldDescriptor, FieldKind, NullFilter, RelationDescriptor,
};

const fn field(
    name: &'static str,
    column: &'static str,
    kind: FieldKind,
    required: bool,
) -> FieldDescriptor {
    FieldDescriptor {
        name,
        column,
        kind,
        required,
    }
}

const fn text(name: &'static str, column: &'static str) -> FieldDescriptor {
    field(name, column, FieldKind::Text, true)
}

const fn integer(name: &'static str, column: &'static str) -> FieldDescriptor {
    field(name, column, FieldKind::Integer, true)
}

const fn instant(name: &'static str, column: &'static str) -> FieldDescriptor {
    field(name, column, FieldKind::Instant, true)
}

const fn relation(
    name: &'static str,
    column: &'static str,
    target: &'static EntityDescriptor,
) -> RelationDescriptor {
    RelationDescriptor {
        name,
        column,
        target,
        display_field: Some("libelle"),
    }
}

const LIBELLE: FieldDescriptor = text("libelle", "libelle");
const RESPONSABLE: FieldDescriptor = text("responsable", "responsable");
const CONTACT: FieldDescriptor = text("contact", "contact");

// ---------------------------------------------------------------------------
// Administrative and cadastral tree
// Parcelle -> Lot -> Section -> Secteur -> Localite -> Commune -> Province -> Region
// ---------------------------------------------------------------------------

pub static REGION: EntityDescriptor = EntityDescriptor {
    name: "Region",
    table: "region",
    resource: "regions",
    fields: &[LIBELLE],
    relations: &[],
    null_filters: &[],
};

pub static PROVINCE: EntityDescriptor = EntityDescriptor {
    name: "Province",
    table: "province",
    resource: "provinces",
    fields: &[LIBELLE],
    relations: &[relation("region", "region_id", &REGION)],
    null_filters: &[],
};

pub static TYPE_COMMUNE: EntityDescriptor = EntityDescriptor {
    name: "TypeCommune",
    table: "type_commune",
    resource: "type-communes",
    fields: &[LIBELLE],
    relations: &[],
    null_filters: &[],
};

pub static COMMUNE: EntityDescriptor = EntityDescriptor {
    name: "Commune",
    table: "commune",
    resource: "communes",
    fields: &[LIBELLE],
    relations: &[
        relation("province", "province_id", &PROVINCE),
        relation("typecommune", "typecommune_id", &TYPE_COMMUNE),
    ],
    null_filters: &[],
};

pub static LOCALITE: EntityDescriptor = EntityDescriptor {
    name: "Localite",
    table: "localite",
    resource: "localites",
    fields: &[LIBELLE],
    relations: &[relation("commune", "commune_id", &COMMUNE)],
    null_filters: &[],
};

pub static SECTEUR: EntityDescriptor = EntityDescriptor {
    name: "Secteur",
    table: "secteur",
    resource: "secteurs",
    fields: &[LIBELLE],
    relations: &[relation("localite", "localite_id", &LOCALITE)],
    null_filters: &[],
};

pub static SECTION: EntityDescriptor = EntityDescriptor {
    name: "Section",
    table: "section",
    resource: "sections",
    fields: &[LIBELLE],
    relations: &[relation("secteur", "secteur_id", &SECTEUR)],
    null_filters: &[],
};

pub static LOT: EntityDescriptor = EntityDescriptor {
    name: "Lot",
    table: "lot",
    resource: "lots",
    fields: &[LIBELLE],
    relations: &[relation("section", "section_id", &SECTION)],
    null_filters: &[],
};

pub static PARCELLE: EntityDescriptor = EntityDescriptor {
    name: "Parcelle",
    table: "parcelle",
    resource: "parcelles",
    fields: &[LIBELLE],
    relations: &[relation("lot", "lot_id", &LOT)],
    null_filters: &[],
};

// ---------------------------------------------------------------------------
// Operator organisation
// ---------------------------------------------------------------------------

pub static DIRECTION_REGIONALE: EntityDescriptor = EntityDescriptor {
    name: "DirectionRegionale",
    table: "direction_regionale",
    resource: "direction-regionales",
    fields: &[LIBELLE, RESPONSABLE, CONTACT],
    relations: &[],
    null_filters: &[],
};

pub static CENTRE_REGROUPEMENT: EntityDescriptor = EntityDescriptor {
    name: "CentreRegroupement",
    table: "centre_regroupement",
    resource: "centre-regroupements",
    fields: &[LIBELLE, RESPONSABLE, CONTACT],
    relations: &[relation(
        "directionregionale",
        "directionregionale_id",
        &DIRECTION_REGIONALE,
    )],
    null_filters: &[],
};

pub static CENTRE: EntityDescriptor = EntityDescriptor {
    name: "Centre",
    table: "centre",
    resource: "centres",
    fields: &[LIBELLE, RESPONSABLE, CONTACT],
    relations: &[relation(
        "centreregroupement",
        "centreregroupement_id",
        &CENTRE_REGROUPEMENT,
    )],
    null_filters: &[NullFilter {
        name: "prevision-is-null",
        referencing_table: "prevision",
        referencing_column: "centre_id",
    }],
};

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

pub static ANNEE: EntityDescriptor = EntityDescriptor {
    name: "Annee",
    table: "annee",
    resource: "annees",
    fields: &[LIBELLE],
    relations: &[],
    null_filters: &[NullFilter {
        name: "prevision-is-null",
        referencing_table: "prevision",
        referencing_column: "refannee_id",
    }],
};

pub static PREVISION: EntityDescriptor = EntityDescriptor {
    name: "Prevision",
    table: "prevision",
    resource: "previsions",
    fields: &[
        integer("nbLatrine", "nb_latrine"),
        integer("nbPuisard", "nb_puisard"),
        integer("nbPublic", "nb_public"),
        integer("nbScolaire", "nb_scolaire"),
    ],
    relations: &[
        relation("centre", "centre_id", &CENTRE),
        relation("refannee", "refannee_id", &ANNEE),
    ],
    null_filters: &[],
};

// ---------------------------------------------------------------------------
// Reference tables
// ---------------------------------------------------------------------------

pub static NATURE_OUVRAGE: EntityDescriptor = EntityDescriptor {
    name: "NatureOuvrage",
    table: "nature_ouvrage",
    resource: "nature-ouvrages",
    fields: &[LIBELLE],
    relations: &[],
    null_filters: &[],
};

pub static TYPE_HABITATION: EntityDescriptor = EntityDescriptor {
    name: "TypeHabitation",
    table: "type_habitation",
    resource: "type-habitations",
    fields: &[LIBELLE],
    relations: &[],
    null_filters: &[],
};

pub static SOURCE_APPROV_EP: EntityDescriptor = EntityDescriptor {
    name: "SourceApprovEp",
    table: "source_approv_ep",
    resource: "source-approv-eps",
    fields: &[LIBELLE],
    relations: &[],
    null_filters: &[],
};

pub static MODE_EVACUATION_EAU_USEE: EntityDescriptor = EntityDescriptor {
    name: "ModeEvacuationEauUsee",
    table: "mode_evacuation_eau_usee",
    resource: "mode-evacuation-eau-usees",
    fields: &[LIBELLE],
    relations: &[],
    null_filters: &[],
};

pub static MODE_EVAC_EXCRETA: EntityDescriptor = EntityDescriptor {
    name: "ModeEvacExcreta",
    table: "mode_evac_excreta",
    resource: "mode-evac-excretas",
    fields: &[LIBELLE],
    relations: &[],
    null_filters: &[],
};

pub static MACON: EntityDescriptor = EntityDescriptor {
    name: "Macon",
    table: "macon",
    resource: "macons",
    fields: &[LIBELLE],
    relations: &[],
    null_filters: &[],
};

pub static PREFABRICANT: EntityDescriptor = EntityDescriptor {
    name: "Prefabricant",
    table: "prefabricant",
    resource: "prefabricants",
    fields: &[LIBELLE],
    relations: &[],
    null_filters: &[],
};

// ---------------------------------------------------------------------------
// Construction follow-up sheet
// ---------------------------------------------------------------------------

pub static FICHE_SUIVI_OUVRAGE: EntityDescriptor = EntityDescriptor {
    name: "FicheSuiviOuvrage",
    table: "fiche_suivi_ouvrage",
    resource: "fiche-suivi-ouvrages",
    fields: &[
        text("prjAppuis", "prj_appuis"),
        text("nomBenef", "nom_benef"),
        text("prenomBenef", "prenom_benef"),
        text("professionBenef", "profession_benef"),
        field("nbUsagers", "nb_usagers", FieldKind::Long, true),
        text("contacts", "contacts"),
        field("longitude", "longitude", FieldKind::Float, true),
        field("latitude", "latitude", FieldKind::Float, true),
        instant("dateRemiseDevis", "date_remise_devis"),
        instant("dateDebutTravaux", "date_debut_travaux"),
        instant("dateFinTravaux", "date_fin_travaux"),
        field("rue", "rue", FieldKind::Text, false),
        field("porte", "porte", FieldKind::Text, false),
        text("coutMenage", "cout_menage"),
        integer("subvOnea", "subv_onea"),
        integer("subvProjet", "subv_projet"),
        integer("autreSubv", "autre_subv"),
        integer("toles", "toles"),
        text("animateur", "animateur"),
        text("superviseur", "superviseur"),
        text("controleur", "controleur"),
    ],
    relations: &[
        relation("parcelle", "parcelle_id", &PARCELLE),
        RelationDescriptor {
            name: "prevision",
            column: "prevision_id",
            target: &PREVISION,
            display_field: None,
        },
        relation("natureouvrage", "natureouvrage_id", &NATURE_OUVRAGE),
        relation("typehabitation", "typehabitation_id", &TYPE_HABITATION),
        relation("sourceapprovep", "sourceapprovep_id", &SOURCE_APPROV_EP),
        relation(
            "modeevacuationeauusee",
            "modeevacuationeauusee_id",
            &MODE_EVACUATION_EAU_USEE,
        ),
        relation("modeevacexcreta", "modeevacexcreta_id", &MODE_EVAC_EXCRETA),
        relation("macon", "macon_id", &MACON),
        relation("prefabricant", "prefabricant_id", &PREFABRICANT),
    ],
    null_filters: &[],
};

/// All entities, in dependency order
pub static CATALOG: &[&EntityDescriptor] = &[
    &REGION,
    &PROVINCE,
    &TYPE_COMMUNE,
    &COMMUNE,
    &LOCALITE,
    &SECTEUR,
    &SECTION,
    &LOT,
    &PARCELLE,
    &DIRECTION_REGIONALE,
    &CENTRE_REGROUPEMENT,
    &CENTRE,
    &ANNEE,
    &PREVISION,
    &NATURE_OUVRAGE,
    &TYPE_HABITATION,
    &SOURCE_APPROV_EP,
    &MODE_EVACUATION_EAU_USEE,
    &MODE_EVAC_EXCRETA,
    &MACON,
    &PREFABRICANT,
    &FICHE_SUIVI_OUVRAGE,
];

/// Find an entity by its REST resource path (`provinces`)
pub fn by_resource(resource: &str) -> Option<&'static EntityDescriptor> {
    CATALOG.iter().copied().find(|d| d.resource == resource)
}

/// Find an entity by name, case-insensitively (`Province`, `province`)
pub fn by_name(name: &str) -> Option<&'static EntityDescriptor> {
    CATALOG
        .iter()
        .copied()
        .find(|d| d.name.eq_ignore_ascii_case(name))
}
