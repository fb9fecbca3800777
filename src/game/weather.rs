//! Weather set by voice keywords: scales fire spread and the water level

/// Fraction of the way the water level moves toward its target per change
const WATER_SMOOTHING: f32 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherKind {
    #[default]
    None,
    Drizzle,
    Rain,
    Flood,
    Drought,
}

impl WeatherKind {
    /// (spread multiplier, fuel moisture, target water level)
    fn table(self) -> (f32, f32, f32) {
        match self {
            WeatherKind::None => (1.0, 1.0, 0.0),
            WeatherKind::Drizzle => (0.9, 1.1, 0.1),
            WeatherKind::Rain => (0.75, 1.3, 0.25),
            WeatherKind::Flood => (0.55, 1.6, 0.55),
            WeatherKind::Drought => (1.4, 0.75, 0.0),
        }
    }

    pub fn banner(self) -> &'static str {
        match self {
            WeatherKind::None => "Normal",
            WeatherKind::Drizzle => "Drizzling",
            WeatherKind::Rain => "Raining",
            WeatherKind::Flood => "Flooding",
            WeatherKind::Drought => "Drought",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            WeatherKind::None => "none",
            WeatherKind::Drizzle => "drizzle",
            WeatherKind::Rain => "rain",
            WeatherKind::Flood => "flood",
            WeatherKind::Drought => "drought",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Weather {
    pub kind: WeatherKind,
    pub fire_spread_multiplier: f32,
    pub fuel_moisture: f32,
    pub water_level: f32,
}

impl Default for Weather {
    fn default() -> Self {
        Self {
            kind: WeatherKind::None,
            fire_spread_multiplier: 1.0,
            fuel_moisture: 1.0,
            water_level: 0.0,
        }
    }
}

impl Weather {
    pub fn set(&mut self, kind: WeatherKind) {
        self.kind = kind;
        let (spread, moisture, target) = kind.table();
        self.fire_spread_multiplier = spread;
        self.fuel_moisture = moisture;
        self.water_level = lerp(self.water_level, target, WATER_SMOOTHING);
    }
}

fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}
