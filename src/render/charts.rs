//! PNG chart rendering with plotters.
//!
//! Colors and layout follow the house style of the previous generation of
//! report tooling: MODFLOW history in muted tones, metamodel forecast in
//! saturated ones, and a marked regime transition on every time chart.

use chrono::{Duration, NaiveDate};
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::{RangedCoordf64, RangedDate};
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::error::Error;
use std::path::{Path, PathBuf};

use crate::analysis::aggregate::metric_stats;
use crate::model::{
    PercentileClass, Regime, Series, TimePoint, WellPoint, ZoneAggregate, ZoneBoundary,
    METRIC_HEAD_ABSOLUTE, METRIC_HEAD_DELTA, METRIC_STEP_IN, METRIC_STEP_OUT, METRIC_STEP_RATE,
};

use super::{RenderError, RenderSink};

// ---------------------------------------------------------------------------
// Palette
// ---------------------------------------------------------------------------

const COLOR_HEAD_HISTORICAL: RGBColor = RGBColor(128, 128, 128);
const COLOR_HEAD_FORECAST: RGBColor = RGBColor(30, 144, 255);
const COLOR_WELL_HISTORY: RGBColor = RGBColor(30, 136, 229);
const COLOR_WELL_FORECAST: RGBColor = RGBColor(231, 76, 60);
const COLOR_REFERENCE_MEAN: RGBColor = RGBColor(52, 152, 219);
const COLOR_EVOLUTION_HIST: RGBColor = RGBColor(46, 134, 171);
const COLOR_EVOLUTION_FORECAST: RGBColor = RGBColor(242, 66, 54);
const COLOR_ZONE_FILL: RGBColor = RGBColor(52, 152, 219);
const COLOR_ZONE_EDGE: RGBColor = RGBColor(26, 84, 144);
const COLOR_BOUNDARY: RGBColor = RGBColor(120, 120, 120);
const COLOR_NET_POSITIVE: RGBColor = RGBColor(6, 167, 125);
const COLOR_NET_NEGATIVE: RGBColor = RGBColor(221, 28, 26);

const COMPARATIVE_PALETTE: [RGBColor; 8] = [
    RGBColor(30, 136, 229),
    RGBColor(231, 76, 60),
    RGBColor(39, 174, 96),
    RGBColor(243, 156, 18),
    RGBColor(155, 89, 182),
    RGBColor(52, 152, 219),
    RGBColor(230, 126, 34),
    RGBColor(26, 188, 156),
];

/// (historical, forecast) bar colors for one balance component.
fn component_colors(metric: &str) -> (RGBColor, RGBColor) {
    match metric {
        METRIC_STEP_IN => (RGBColor(46, 134, 171), RGBColor(6, 174, 213)),
        METRIC_STEP_OUT => (RGBColor(221, 28, 26), RGBColor(242, 66, 54)),
        METRIC_STEP_RATE => (RGBColor(6, 167, 125), RGBColor(76, 185, 99)),
        _ => (RGBColor(128, 128, 128), RGBColor(30, 144, 255)),
    }
}

fn class_color(class: PercentileClass) -> RGBColor {
    match class {
        PercentileClass::Low => RGBColor(231, 76, 60),
        PercentileClass::MedLow => RGBColor(243, 156, 18),
        PercentileClass::MedHigh => RGBColor(241, 196, 15),
        PercentileClass::High => RGBColor(39, 174, 96),
    }
}

fn metric_title(metric: &str) -> &str {
    match metric {
        METRIC_HEAD_ABSOLUTE => "Head Absoluto",
        METRIC_HEAD_DELTA => "Head Delta",
        METRIC_STEP_IN => "Step In (Entrada)",
        METRIC_STEP_OUT => "Step Out (Salida)",
        METRIC_STEP_RATE => "Step Rate (Tasa)",
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Axis helpers
// ---------------------------------------------------------------------------

/// Date axis bounds with a margin so edge points do not sit on the frame.
fn date_bounds(points: &[TimePoint]) -> Result<(NaiveDate, NaiveDate), Box<dyn Error>> {
    let min = points.iter().map(|p| p.date).min().ok_or("empty series")?;
    let max = points.iter().map(|p| p.date).max().ok_or("empty series")?;
    Ok((min - Duration::days(20), max + Duration::days(20)))
}

/// Value axis bounds padded by 5%, widened to a unit band when flat.
fn value_bounds(values: impl Iterator<Item = f64>, include_zero: bool) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for v in values {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if lo > hi {
        return (0.0, 1.0);
    }
    if include_zero {
        lo = lo.min(0.0);
        hi = hi.max(0.0);
    }
    let span = hi - lo;
    let pad = if span > 0.0 { span * 0.05 } else { 1.0 };
    (lo - pad, hi + pad)
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// `RenderSink` that writes PNG artifacts into one output directory.
/// The directory is created on construction; re-running the pipeline
/// overwrites prior artifacts in place.
pub struct ChartRenderer {
    out_dir: PathBuf,
}

impl ChartRenderer {
    pub fn new(out_dir: impl Into<PathBuf>) -> std::io::Result<ChartRenderer> {
        let out_dir = out_dir.into();
        std::fs::create_dir_all(&out_dir)?;
        Ok(ChartRenderer { out_dir })
    }

    fn artifact_path(&self, file_name: &str) -> PathBuf {
        self.out_dir.join(file_name)
    }
}

fn backend_err(e: impl std::fmt::Display) -> RenderError {
    RenderError::Backend(e.to_string())
}

impl RenderSink for ChartRenderer {
    fn zone_head_chart(
        &self,
        zone_name: &str,
        metric: &str,
        series: &Series,
    ) -> Result<PathBuf, RenderError> {
        if series.is_empty() {
            return Err(RenderError::EmptyInput);
        }
        let path = self.artifact_path(&format!("{}_{}.png", zone_name, metric));
        draw_zone_head(&path, zone_name, metric, series).map_err(backend_err)?;
        Ok(path)
    }

    fn zone_balance_chart(
        &self,
        zone_name: &str,
        metric: &str,
        series: &Series,
    ) -> Result<PathBuf, RenderError> {
        if series.is_empty() {
            return Err(RenderError::EmptyInput);
        }
        let path = self.artifact_path(&format!("{}_balance_{}.png", zone_name, metric));
        draw_zone_balance(&path, zone_name, metric, series).map_err(backend_err)?;
        Ok(path)
    }

    fn zone_balance_combined_chart(
        &self,
        zone_name: &str,
        by_metric: &BTreeMap<String, Series>,
    ) -> Result<PathBuf, RenderError> {
        if by_metric.values().all(|s| s.is_empty()) {
            return Err(RenderError::EmptyInput);
        }
        let path = self.artifact_path(&format!("{}_balance_combinado.png", zone_name));
        draw_zone_balance_combined(&path, zone_name, by_metric).map_err(backend_err)?;
        Ok(path)
    }

    fn wells_map(
        &self,
        wells: &[WellPoint],
        zones: &[ZoneBoundary],
    ) -> Result<PathBuf, RenderError> {
        if wells.is_empty() && zones.is_empty() {
            return Err(RenderError::EmptyInput);
        }
        let path = self.artifact_path("distribucion_pozos_percentiles.png");
        draw_wells_map(&path, wells, zones).map_err(backend_err)?;
        Ok(path)
    }

    fn well_history_chart(
        &self,
        well_id: &str,
        label: &str,
        series: &Series,
    ) -> Result<PathBuf, RenderError> {
        if series.is_empty() {
            return Err(RenderError::EmptyInput);
        }
        let path = self.artifact_path(&format!("{}_historico.png", well_id));
        draw_well_history(&path, well_id, label, series).map_err(backend_err)?;
        Ok(path)
    }

    fn well_forecast_chart(
        &self,
        well_id: &str,
        label: &str,
        series: &Series,
    ) -> Result<PathBuf, RenderError> {
        if series.is_empty() {
            return Err(RenderError::EmptyInput);
        }
        let path = self.artifact_path(&format!("{}_pronostico.png", well_id));
        draw_well_forecast(&path, well_id, label, series).map_err(backend_err)?;
        Ok(path)
    }

    fn comparative_chart(
        &self,
        file_stem: &str,
        title: &str,
        entries: &[(String, Series)],
    ) -> Result<PathBuf, RenderError> {
        if entries.iter().all(|(_, s)| s.is_empty()) {
            return Err(RenderError::EmptyInput);
        }
        let path = self.artifact_path(&format!("{}.png", file_stem));
        draw_comparative(&path, title, entries).map_err(backend_err)?;
        Ok(path)
    }

    fn zone_component_chart(&self, aggregates: &[ZoneAggregate]) -> Result<PathBuf, RenderError> {
        if aggregates.is_empty() {
            return Err(RenderError::EmptyInput);
        }
        let path = self.artifact_path("comparacion_componentes_zonas.png");
        draw_zone_components(&path, aggregates).map_err(backend_err)?;
        Ok(path)
    }

    fn net_balance_chart(&self, aggregates: &[ZoneAggregate]) -> Result<PathBuf, RenderError> {
        if aggregates.iter().all(|a| a.net_balance.is_none()) {
            return Err(RenderError::EmptyInput);
        }
        let path = self.artifact_path("balance_neto_zonas.png");
        draw_net_balance(&path, aggregates).map_err(backend_err)?;
        Ok(path)
    }

    fn evolution_chart(&self, series: &Series) -> Result<PathBuf, RenderError> {
        if series.is_empty() {
            return Err(RenderError::EmptyInput);
        }
        let path = self.artifact_path("evolucion_balance_total.png");
        draw_evolution(&path, series).map_err(backend_err)?;
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// Drawing functions
// ---------------------------------------------------------------------------

fn draw_zone_head(
    path: &Path,
    zone_name: &str,
    metric: &str,
    series: &Series,
) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(path, (1200, 400)).into_drawing_area();
    root.fill(&WHITE)?;

    let (d0, d1) = date_bounds(series.points())?;
    let (v0, v1) = value_bounds(series.points().iter().map(|p| p.value), false);
    let title = metric_title(metric);

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Zona {} - {}", zone_name, title), ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(d0..d1, v0..v1)?;

    chart
        .configure_mesh()
        .x_desc("Fecha")
        .y_desc(format!("{} (m)", title))
        .x_label_formatter(&|d: &NaiveDate| d.format("%Y-%m").to_string())
        .draw()?;

    let hist: Vec<(NaiveDate, f64)> = series
        .regime_points(Regime::Historical)
        .map(|p| (p.date, p.value))
        .collect();
    if !hist.is_empty() {
        chart
            .draw_series(LineSeries::new(hist, COLOR_HEAD_HISTORICAL.stroke_width(2)))?
            .label("MODFLOW")
            .legend(|(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], COLOR_HEAD_HISTORICAL.stroke_width(2))
            });
    }

    let forecast: Vec<(NaiveDate, f64)> = series
        .regime_points(Regime::Forecast)
        .map(|p| (p.date, p.value))
        .collect();
    if !forecast.is_empty() {
        chart
            .draw_series(LineSeries::new(forecast, COLOR_HEAD_FORECAST.stroke_width(2)))?
            .label("Metamodelo")
            .legend(|(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], COLOR_HEAD_FORECAST.stroke_width(2))
            });
    }

    if let Some(boundary) = series.boundary_date() {
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(boundary, v0), (boundary, v1)],
            COLOR_BOUNDARY,
        )))?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.9))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn draw_balance_bars_into(
    chart: &mut ChartContext<
        '_,
        BitMapBackend<'_>,
        Cartesian2d<RangedDate<NaiveDate>, RangedCoordf64>,
    >,
    metric: &str,
    series: &Series,
    with_labels: bool,
) -> Result<(), Box<dyn Error>> {
    let (hist_color, forecast_color) = component_colors(metric);
    let half = Duration::days(9);

    for (regime, color, label) in [
        (Regime::Historical, hist_color, "MODFLOW"),
        (Regime::Forecast, forecast_color, "Metamodelo"),
    ] {
        let bars: Vec<Rectangle<(NaiveDate, f64)>> = series
            .regime_points(regime)
            .map(|p| {
                Rectangle::new(
                    [
                        (p.date - half, p.value.min(0.0)),
                        (p.date + half, p.value.max(0.0)),
                    ],
                    color.filled(),
                )
            })
            .collect();
        if bars.is_empty() {
            continue;
        }
        let annotation = chart.draw_series(bars)?;
        if with_labels {
            annotation.label(label).legend(move |(x, y)| {
                Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled())
            });
        }
    }
    Ok(())
}

fn draw_zone_balance(
    path: &Path,
    zone_name: &str,
    metric: &str,
    series: &Series,
) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(path, (1400, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let (d0, d1) = date_bounds(series.points())?;
    let (v0, v1) = value_bounds(series.points().iter().map(|p| p.value), true);

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!(
                "Zona {} - Balance Hídrico: {}",
                zone_name,
                metric_title(metric)
            ),
            ("sans-serif", 22),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d(d0..d1, v0..v1)?;

    chart
        .configure_mesh()
        .x_desc("Fecha")
        .y_desc("Volumen (m³)")
        .x_label_formatter(&|d: &NaiveDate| d.format("%Y-%m").to_string())
        .draw()?;

    draw_balance_bars_into(&mut chart, metric, series, true)?;

    if let Some(boundary) = series.boundary_date() {
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(boundary, v0), (boundary, v1)],
            COLOR_BOUNDARY,
        )))?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.9))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn draw_zone_balance_combined(
    path: &Path,
    zone_name: &str,
    by_metric: &BTreeMap<String, Series>,
) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(path, (1400, 1200)).into_drawing_area();
    root.fill(&WHITE)?;
    let titled = root.titled(
        &format!("Balance Hídrico - Zona: {}", zone_name),
        ("sans-serif", 26),
    )?;

    let areas = titled.split_evenly((3, 1));
    let components = [METRIC_STEP_IN, METRIC_STEP_OUT, METRIC_STEP_RATE];

    for (area, metric) in areas.iter().zip(components) {
        let series = match by_metric.get(metric) {
            Some(s) if !s.is_empty() => s,
            _ => continue,
        };

        let (d0, d1) = date_bounds(series.points())?;
        let (v0, v1) = value_bounds(series.points().iter().map(|p| p.value), true);

        let mut chart = ChartBuilder::on(area)
            .caption(metric_title(metric), ("sans-serif", 18))
            .margin(8)
            .x_label_area_size(35)
            .y_label_area_size(80)
            .build_cartesian_2d(d0..d1, v0..v1)?;

        chart
            .configure_mesh()
            .y_desc("m³")
            .x_label_formatter(&|d: &NaiveDate| d.format("%Y-%m").to_string())
            .draw()?;

        draw_balance_bars_into(&mut chart, metric, series, false)?;

        if let Some(boundary) = series.boundary_date() {
            chart.draw_series(std::iter::once(PathElement::new(
                vec![(boundary, v0), (boundary, v1)],
                COLOR_BOUNDARY,
            )))?;
        }
    }

    root.present()?;
    Ok(())
}

fn draw_wells_map(
    path: &Path,
    wells: &[WellPoint],
    zones: &[ZoneBoundary],
) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(path, (1000, 1100)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut lon_lo = f64::INFINITY;
    let mut lon_hi = f64::NEG_INFINITY;
    let mut lat_lo = f64::INFINITY;
    let mut lat_hi = f64::NEG_INFINITY;
    let coords = zones
        .iter()
        .flat_map(|z| z.rings.iter().flat_map(|r| r.vertices.iter().copied()))
        .chain(wells.iter().map(|w| (w.lon, w.lat)));
    for (lon, lat) in coords {
        lon_lo = lon_lo.min(lon);
        lon_hi = lon_hi.max(lon);
        lat_lo = lat_lo.min(lat);
        lat_hi = lat_hi.max(lat);
    }
    let lon_pad = ((lon_hi - lon_lo) * 0.03).max(0.01);
    let lat_pad = ((lat_hi - lat_lo) * 0.03).max(0.01);

    let mut chart = ChartBuilder::on(&root)
        .caption(
            "Distribución Espacial de Pozos por Clasificación de Percentiles",
            ("sans-serif", 22),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(
            (lon_lo - lon_pad)..(lon_hi + lon_pad),
            (lat_lo - lat_pad)..(lat_hi + lat_pad),
        )?;

    chart
        .configure_mesh()
        .x_desc("Longitud (°)")
        .y_desc("Latitud (°)")
        .draw()?;

    // Zone backdrop first so well markers stay on top.
    for zone in zones {
        for ring in &zone.rings {
            chart.draw_series(std::iter::once(Polygon::new(
                ring.vertices.clone(),
                COLOR_ZONE_FILL.mix(0.45).filled(),
            )))?;
            let mut outline = ring.vertices.clone();
            if let Some(first) = outline.first().copied() {
                outline.push(first);
            }
            chart.draw_series(std::iter::once(PathElement::new(
                outline,
                COLOR_ZONE_EDGE.stroke_width(2),
            )))?;
        }
    }

    for class in [
        PercentileClass::Low,
        PercentileClass::MedLow,
        PercentileClass::MedHigh,
        PercentileClass::High,
    ] {
        let members: Vec<&WellPoint> = wells.iter().filter(|w| w.class == Some(class)).collect();
        if members.is_empty() {
            continue;
        }
        let color = class_color(class);
        let count = members.len();
        chart
            .draw_series(
                members
                    .iter()
                    .map(|w| Circle::new((w.lon, w.lat), 6, color.filled())),
            )?
            .label(format!("{} ({} pozos)", class.label(), count))
            .legend(move |(x, y)| Circle::new((x + 5, y), 5, color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.95))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn draw_well_history(
    path: &Path,
    well_id: &str,
    label: &str,
    series: &Series,
) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(path, (1400, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let (d0, d1) = date_bounds(series.points())?;
    let (v0, v1) = value_bounds(series.points().iter().map(|p| p.value), false);

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Histórico de Nivel de Agua - {} | {}", well_id, label),
            ("sans-serif", 22),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(d0..d1, v0..v1)?;

    chart
        .configure_mesh()
        .x_desc("Fecha")
        .y_desc("Nivel (m.s.n.m.)")
        .x_label_formatter(&|d: &NaiveDate| d.format("%Y-%m").to_string())
        .draw()?;

    let points: Vec<(NaiveDate, f64)> = series.points().iter().map(|p| (p.date, p.value)).collect();
    chart
        .draw_series(LineSeries::new(
            points.clone(),
            COLOR_WELL_HISTORY.stroke_width(2),
        ))?
        .label("Nivel del agua")
        .legend(|(x, y)| {
            PathElement::new(vec![(x, y), (x + 20, y)], COLOR_WELL_HISTORY.stroke_width(2))
        });
    chart.draw_series(
        points
            .iter()
            .map(|(d, v)| Circle::new((*d, *v), 3, COLOR_WELL_HISTORY.filled())),
    )?;

    if let Some(stats) = metric_stats(series) {
        for (value, color, text) in [
            (
                stats.mean,
                COLOR_WELL_FORECAST,
                format!("Promedio: {:.2} m", stats.mean),
            ),
            (
                stats.max,
                RGBColor(39, 174, 96),
                format!("Máximo: {:.2} m", stats.max),
            ),
            (
                stats.min,
                RGBColor(243, 156, 18),
                format!("Mínimo: {:.2} m", stats.min),
            ),
        ] {
            chart
                .draw_series(std::iter::once(PathElement::new(
                    vec![(d0, value), (d1, value)],
                    color,
                )))?
                .label(text)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        }
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.9))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn draw_well_forecast(
    path: &Path,
    well_id: &str,
    label: &str,
    series: &Series,
) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(path, (1400, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let (d0, d1) = date_bounds(series.points())?;
    let (v0, v1) = value_bounds(series.points().iter().map(|p| p.value), true);

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Pronóstico de Nivel de Agua - {} | {}", well_id, label),
            ("sans-serif", 22),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(d0..d1, v0..v1)?;

    chart
        .configure_mesh()
        .x_desc("Fecha")
        .y_desc("Variación Pronosticada (m)")
        .x_label_formatter(&|d: &NaiveDate| d.format("%Y-%m").to_string())
        .draw()?;

    // Zero is the current level: everything above is recovery, everything
    // below is further drawdown.
    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![(d0, 0.0), (d1, 0.0)],
            BLACK.stroke_width(2),
        )))?
        .label("Nivel actual (referencia)")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK.stroke_width(2)));

    let points: Vec<(NaiveDate, f64)> = series.points().iter().map(|p| (p.date, p.value)).collect();
    chart
        .draw_series(LineSeries::new(
            points.clone(),
            COLOR_WELL_FORECAST.stroke_width(2),
        ))?
        .label("Pronóstico")
        .legend(|(x, y)| {
            PathElement::new(vec![(x, y), (x + 20, y)], COLOR_WELL_FORECAST.stroke_width(2))
        });
    chart.draw_series(
        points
            .iter()
            .map(|(d, v)| Circle::new((*d, *v), 3, COLOR_WELL_FORECAST.filled())),
    )?;

    if let Some(stats) = metric_stats(series) {
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(d0, stats.mean), (d1, stats.mean)],
                COLOR_REFERENCE_MEAN,
            )))?
            .label(format!("Promedio: {:.4} m", stats.mean))
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], COLOR_REFERENCE_MEAN));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.9))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn draw_comparative(
    path: &Path,
    title: &str,
    entries: &[(String, Series)],
) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(path, (1400, 700)).into_drawing_area();
    root.fill(&WHITE)?;

    let all_points: Vec<&TimePoint> = entries
        .iter()
        .flat_map(|(_, s)| s.points().iter())
        .collect();
    let d0 = all_points.iter().map(|p| p.date).min().ok_or("empty series")? - Duration::days(20);
    let d1 = all_points.iter().map(|p| p.date).max().ok_or("empty series")? + Duration::days(20);
    let (v0, v1) = value_bounds(all_points.iter().map(|p| p.value), false);

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(d0..d1, v0..v1)?;

    chart
        .configure_mesh()
        .x_desc("Fecha")
        .y_desc("Nivel (m)")
        .x_label_formatter(&|d: &NaiveDate| d.format("%Y-%m").to_string())
        .draw()?;

    for (idx, (label, series)) in entries.iter().enumerate() {
        if series.is_empty() {
            continue;
        }
        let color = COMPARATIVE_PALETTE[idx % COMPARATIVE_PALETTE.len()];
        chart
            .draw_series(LineSeries::new(
                series.points().iter().map(|p| (p.date, p.value)),
                color.stroke_width(2),
            ))?
            .label(label.clone())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
            });
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.9))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn draw_zone_components(path: &Path, aggregates: &[ZoneAggregate]) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(path, (1400, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let means: Vec<f64> = aggregates
        .iter()
        .flat_map(|a| {
            [METRIC_STEP_IN, METRIC_STEP_OUT, METRIC_STEP_RATE]
                .into_iter()
                .filter_map(|m| a.stats.get(m).map(|s| s.mean))
        })
        .collect();
    let (v0, v1) = value_bounds(means.into_iter(), true);
    let n = aggregates.len();
    let zone_ids: Vec<String> = aggregates.iter().map(|a| a.zone_id.clone()).collect();

    let mut chart = ChartBuilder::on(&root)
        .caption(
            "Comparación de Componentes del Balance por Zona (Promedio)",
            ("sans-serif", 22),
        )
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(90)
        .build_cartesian_2d(-0.6f64..(n as f64 - 0.4), v0..v1)?;

    chart
        .configure_mesh()
        .x_desc("Zona")
        .y_desc("Volumen Promedio (m³)")
        .x_labels(n)
        .x_label_formatter(&|x: &f64| {
            let idx = x.round();
            if (x - idx).abs() < 0.01 && idx >= 0.0 && (idx as usize) < zone_ids.len() {
                zone_ids[idx as usize].clone()
            } else {
                String::new()
            }
        })
        .draw()?;

    let components = [
        (METRIC_STEP_IN, -0.3, "Step In"),
        (METRIC_STEP_OUT, -0.1, "Step Out"),
        (METRIC_STEP_RATE, 0.1, "Step Rate"),
    ];
    for (metric, offset, label) in components {
        let (color, _) = component_colors(metric);
        let bars: Vec<Rectangle<(f64, f64)>> = aggregates
            .iter()
            .enumerate()
            .filter_map(|(i, agg)| {
                agg.stats.get(metric).map(|s| {
                    Rectangle::new(
                        [
                            (i as f64 + offset, s.mean.min(0.0)),
                            (i as f64 + offset + 0.2, s.mean.max(0.0)),
                        ],
                        color.filled(),
                    )
                })
            })
            .collect();
        if bars.is_empty() {
            continue;
        }
        chart
            .draw_series(bars)?
            .label(label)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.9))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn draw_net_balance(path: &Path, aggregates: &[ZoneAggregate]) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(path, (1400, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    // Zones without a known net balance are left off the chart entirely;
    // a zero-height bar would misreport "no data" as balance.
    let known: Vec<(&str, f64)> = aggregates
        .iter()
        .filter_map(|a| a.net_balance.map(|net| (a.zone_id.as_str(), net)))
        .collect();

    let (v0, v1) = value_bounds(known.iter().map(|(_, net)| *net), true);
    let n = known.len();
    let zone_ids: Vec<String> = known.iter().map(|(id, _)| id.to_string()).collect();

    let mut chart = ChartBuilder::on(&root)
        .caption("Balance Neto Promedio por Zona", ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(90)
        .build_cartesian_2d(-0.6f64..(n as f64 - 0.4), v0..v1)?;

    chart
        .configure_mesh()
        .x_desc("Zona")
        .y_desc("Balance Neto Promedio (m³)")
        .x_labels(n.max(1))
        .x_label_formatter(&|x: &f64| {
            let idx = x.round();
            if (x - idx).abs() < 0.01 && idx >= 0.0 && (idx as usize) < zone_ids.len() {
                zone_ids[idx as usize].clone()
            } else {
                String::new()
            }
        })
        .draw()?;

    chart.draw_series(known.iter().enumerate().map(|(i, (_, net))| {
        let color = if *net >= 0.0 {
            COLOR_NET_POSITIVE
        } else {
            COLOR_NET_NEGATIVE
        };
        Rectangle::new(
            [
                (i as f64 - 0.3, net.min(0.0)),
                (i as f64 + 0.3, net.max(0.0)),
            ],
            color.filled(),
        )
    }))?;

    chart.draw_series(std::iter::once(PathElement::new(
        vec![(-0.6, 0.0), (n as f64 - 0.4, 0.0)],
        COLOR_BOUNDARY,
    )))?;

    root.present()?;
    Ok(())
}

fn draw_evolution(path: &Path, series: &Series) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(path, (1400, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let (d0, d1) = date_bounds(series.points())?;
    let (v0, v1) = value_bounds(series.points().iter().map(|p| p.value), true);

    let mut chart = ChartBuilder::on(&root)
        .caption("Evolución del Balance Total del Sistema", ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(90)
        .build_cartesian_2d(d0..d1, v0..v1)?;

    chart
        .configure_mesh()
        .x_desc("Fecha")
        .y_desc("Balance Total (m³)")
        .x_label_formatter(&|d: &NaiveDate| d.format("%Y-%m").to_string())
        .draw()?;

    let hist: Vec<(NaiveDate, f64)> = series
        .regime_points(Regime::Historical)
        .map(|p| (p.date, p.value))
        .collect();
    if !hist.is_empty() {
        chart
            .draw_series(LineSeries::new(hist, COLOR_EVOLUTION_HIST.stroke_width(2)))?
            .label("Histórico")
            .legend(|(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], COLOR_EVOLUTION_HIST.stroke_width(2))
            });
    }

    let forecast: Vec<(NaiveDate, f64)> = series
        .regime_points(Regime::Forecast)
        .map(|p| (p.date, p.value))
        .collect();
    if !forecast.is_empty() {
        chart
            .draw_series(LineSeries::new(
                forecast,
                COLOR_EVOLUTION_FORECAST.stroke_width(2),
            ))?
            .label("Pronóstico")
            .legend(|(x, y)| {
                PathElement::new(
                    vec![(x, y), (x + 20, y)],
                    COLOR_EVOLUTION_FORECAST.stroke_width(2),
                )
            });
    }

    chart.draw_series(std::iter::once(PathElement::new(
        vec![(d0, 0.0), (d1, 0.0)],
        COLOR_BOUNDARY,
    )))?;

    if let Some(boundary) = series.boundary_date() {
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(boundary, v0), (boundary, v1)],
            COLOR_BOUNDARY.stroke_width(2),
        )))?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.9))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
