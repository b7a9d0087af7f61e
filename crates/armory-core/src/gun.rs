//! The per-gun configuration record.
//!
//! A [`GunConfig`] is pure data. It is produced from a [`FieldBag`] after a
//! schema check, serializes back into one deterministically, and has a
//! well-defined all-defaults instance used whenever a gun's document is
//! missing or invalid.

use crate::field_bag::{FieldBag, Value};
use crate::id::EntityId;
use crate::schema::{self, GUN_SCHEMA, ValidationError};

/// How the gun is held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GripType {
    #[default]
    OneHanded,
    TwoHanded,
    MiniGun,
    Bazooka,
}

impl GripType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GripType::OneHanded => "one_handed",
            GripType::TwoHanded => "two_handed",
            GripType::MiniGun => "mini_gun",
            GripType::Bazooka => "bazooka",
        }
    }

    pub fn parse(s: &str) -> Option<GripType> {
        match s {
            "one_handed" => Some(GripType::OneHanded),
            "two_handed" => Some(GripType::TwoHanded),
            "mini_gun" => Some(GripType::MiniGun),
            "bazooka" => Some(GripType::Bazooka),
            _ => None,
        }
    }
}

/// Handling properties.
#[derive(Debug, Clone, PartialEq)]
pub struct General {
    pub auto: bool,
    /// Ticks between shots.
    pub rate: i32,
    pub grip_type: GripType,
    pub max_ammo: i32,
    pub reload_amount: i32,
    pub recoil_angle: f32,
    pub recoil_kick: f32,
    pub spread: f32,
    pub projectile_amount: i32,
    pub always_spread: bool,
}

impl Default for General {
    fn default() -> Self {
        Self {
            auto: false,
            rate: 10,
            grip_type: GripType::OneHanded,
            max_ammo: 30,
            reload_amount: 1,
            recoil_angle: 0.0,
            recoil_kick: 0.0,
            spread: 0.0,
            projectile_amount: 1,
            always_spread: false,
        }
    }
}

/// What the gun fires.
#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub item: EntityId,
    pub size: f32,
    pub speed: f32,
    /// Lifetime in ticks.
    pub life: i32,
    pub gravity: bool,
    pub damage_reduce_over_life: bool,
    pub visible: bool,
}

impl Default for Projectile {
    fn default() -> Self {
        Self {
            item: EntityId::from_static("armory", "basic_bullet"),
            size: 0.1,
            speed: 10.0,
            life: 100,
            gravity: false,
            damage_reduce_over_life: false,
            visible: false,
        }
    }
}

/// Sound event ids; absent sounds are silent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sounds {
    pub fire: Option<EntityId>,
    pub reload: Option<EntityId>,
    pub cock: Option<EntityId>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Flash {
    pub size: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Display {
    pub flash: Option<Flash>,
}

/// Validated configuration for one gun.
#[derive(Debug, Clone, PartialEq)]
pub struct GunConfig {
    pub damage: f32,
    pub reload_speed: i32,
    pub general: General,
    pub projectile: Projectile,
    pub sounds: Sounds,
    pub display: Display,
    pub attachments: Vec<String>,
}

impl Default for GunConfig {
    fn default() -> Self {
        Self {
            damage: 1.0,
            reload_speed: 1,
            general: General::default(),
            projectile: Projectile::default(),
            sounds: Sounds::default(),
            display: Display::default(),
            attachments: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Field readers. Callers run the schema check first, so a type mismatch here
// means the field is absent and the default applies.
// ---------------------------------------------------------------------------

fn read_bool(bag: &FieldBag, path: &str, default: bool) -> bool {
    bag.get_path(path).and_then(Value::as_bool).unwrap_or(default)
}

fn read_f32(bag: &FieldBag, path: &str, default: f32) -> f32 {
    bag.get_path(path)
        .and_then(Value::as_float)
        .map(|f| f as f32)
        .unwrap_or(default)
}

fn read_i32(bag: &FieldBag, path: &str, default: i32) -> Result<i32, ValidationError> {
    match bag.get_path(path).and_then(Value::as_int) {
        Some(v) => i32::try_from(v).map_err(|_| ValidationError::InvalidValue {
            field: path.to_string(),
            reason: format!("{v} is out of range"),
        }),
        None => Ok(default),
    }
}

fn read_id(bag: &FieldBag, path: &str) -> Result<Option<EntityId>, ValidationError> {
    bag.get_path(path)
        .and_then(Value::as_str)
        .map(|s| {
            s.parse::<EntityId>().map_err(|e| ValidationError::InvalidValue {
                field: path.to_string(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

impl GunConfig {
    /// Reconstruct a gun from a field bag, checking it against
    /// [`GUN_SCHEMA`] first.
    pub fn from_bag(bag: &FieldBag) -> Result<Self, ValidationError> {
        schema::check(bag, GUN_SCHEMA)?;

        let defaults = GunConfig::default();
        let dg = &defaults.general;
        let dp = &defaults.projectile;

        let general = if bag.get("general").is_some() {
            General {
                auto: read_bool(bag, "general.auto", dg.auto),
                rate: read_i32(bag, "general.rate", dg.rate)?,
                grip_type: bag
                    .get_path("general.gripType")
                    .and_then(Value::as_str)
                    .and_then(GripType::parse)
                    .unwrap_or(dg.grip_type),
                max_ammo: read_i32(bag, "general.maxAmmo", dg.max_ammo)?,
                reload_amount: read_i32(bag, "general.reloadAmount", dg.reload_amount)?,
                recoil_angle: read_f32(bag, "general.recoilAngle", dg.recoil_angle),
                recoil_kick: read_f32(bag, "general.recoilKick", dg.recoil_kick),
                spread: read_f32(bag, "general.spread", dg.spread),
                projectile_amount: read_i32(
                    bag,
                    "general.projectileAmount",
                    dg.projectile_amount,
                )?,
                always_spread: read_bool(bag, "general.alwaysSpread", dg.always_spread),
            }
        } else {
            dg.clone()
        };

        let projectile = if bag.get("projectile").is_some() {
            Projectile {
                item: read_id(bag, "projectile.item")?.unwrap_or_else(|| dp.item.clone()),
                size: read_f32(bag, "projectile.size", dp.size),
                speed: read_f32(bag, "projectile.speed", dp.speed),
                life: read_i32(bag, "projectile.life", dp.life)?,
                gravity: read_bool(bag, "projectile.gravity", dp.gravity),
                damage_reduce_over_life: read_bool(
                    bag,
                    "projectile.damageReduceOverLife",
                    dp.damage_reduce_over_life,
                ),
                visible: read_bool(bag, "projectile.visible", dp.visible),
            }
        } else {
            dp.clone()
        };

        let sounds = Sounds {
            fire: read_id(bag, "sounds.fire")?,
            reload: read_id(bag, "sounds.reload")?,
            cock: read_id(bag, "sounds.cock")?,
        };

        let display = Display {
            flash: bag
                .get_path("display.flash")
                .and_then(Value::as_bag)
                .map(|flash| Flash {
                    size: read_f32(flash, "size", 0.0),
                }),
        };

        let attachments = bag
            .get("attachments")
            .and_then(Value::as_list)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(GunConfig {
            damage: read_f32(bag, "damage", defaults.damage),
            reload_speed: read_i32(bag, "reloadSpeed", defaults.reload_speed)?,
            general,
            projectile,
            sounds,
            display,
            attachments,
        })
    }

    /// Serialize every field into a field bag. Absent optional sounds and
    /// flash are omitted; everything else is always written.
    pub fn to_bag(&self) -> FieldBag {
        let g = &self.general;
        let general = FieldBag::new()
            .with("auto", g.auto)
            .with("rate", g.rate)
            .with("gripType", g.grip_type.as_str())
            .with("maxAmmo", g.max_ammo)
            .with("reloadAmount", g.reload_amount)
            .with("recoilAngle", g.recoil_angle)
            .with("recoilKick", g.recoil_kick)
            .with("spread", g.spread)
            .with("projectileAmount", g.projectile_amount)
            .with("alwaysSpread", g.always_spread);

        let p = &self.projectile;
        let projectile = FieldBag::new()
            .with("item", p.item.to_string())
            .with("size", p.size)
            .with("speed", p.speed)
            .with("life", p.life)
            .with("gravity", p.gravity)
            .with("damageReduceOverLife", p.damage_reduce_over_life)
            .with("visible", p.visible);

        let mut sounds = FieldBag::new();
        for (key, sound) in [
            ("fire", &self.sounds.fire),
            ("reload", &self.sounds.reload),
            ("cock", &self.sounds.cock),
        ] {
            if let Some(id) = sound {
                sounds.insert(key, id.to_string());
            }
        }

        let mut display = FieldBag::new();
        if let Some(flash) = &self.display.flash {
            display.insert("flash", FieldBag::new().with("size", flash.size));
        }

        FieldBag::new()
            .with("damage", self.damage)
            .with("reloadSpeed", self.reload_speed)
            .with("general", general)
            .with("projectile", projectile)
            .with("sounds", sounds)
            .with("display", display)
            .with(
                "attachments",
                Value::List(
                    self.attachments
                        .iter()
                        .map(|a| Value::Str(a.clone()))
                        .collect(),
                ),
            )
    }
}
